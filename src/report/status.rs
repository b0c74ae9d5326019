use super::{MISSING_VALUE, TEMPERATURE_UNIT};
use crate::feeds::{FeedRecord, MetricsSnapshot};
use html_escape::encode_text;

/// Label for a raised anomaly flag
pub const ANOMALY_LABEL: &str = "⚠️ Yes";
/// Label for a clear anomaly flag
pub const OK_LABEL: &str = "✅ No";

/// Anomaly label for a record; absent or unknown flags read as OK
#[must_use]
pub fn anomaly_label(record: &FeedRecord) -> &'static str {
    if record.is_anomalous() {
        ANOMALY_LABEL
    } else {
        OK_LABEL
    }
}

/// Raw display value of `field1`, HTML-escaped, or the N/A placeholder
#[must_use]
pub fn display_value(record: &FeedRecord) -> String {
    record
        .field1
        .as_deref()
        .map_or_else(|| MISSING_VALUE.to_string(), |v| encode_text(v).into_owned())
}

fn prediction_block(icon: &str, label: &str, record: &FeedRecord) -> String {
    format!(
        "{icon} <b>{label}</b>\n\
         • Predicted: {} {TEMPERATURE_UNIT}\n\
         • Anomaly: {}\n",
        display_value(record),
        anomaly_label(record)
    )
}

/// Render the status message (HTML parse mode)
#[must_use]
pub fn format_status(snapshot: &MetricsSnapshot) -> String {
    let mut text = String::from("🌡️ <b>Temperature Predictions</b>\n\n");
    text.push_str(&prediction_block("📈", "Polynomial", &snapshot.polynomial));
    text.push('\n');
    text.push_str(&prediction_block("🔁", "LSTM", &snapshot.lstm));

    if let Some(current) = &snapshot.current {
        text.push_str(&format!(
            "\n📍 <b>Current</b>: {} {TEMPERATURE_UNIT}\n",
            display_value(current)
        ));
    }

    text
}
