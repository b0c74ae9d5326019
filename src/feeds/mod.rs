//! Metrics fetching
//!
//! Records and series read from the ThingSpeak feeds, plus the
//! [`MetricsSource`] seam the responder fetches through.

mod thingspeak;

pub use thingspeak::ThingSpeakClient;

use crate::config::{FeedChannel, FeedEndpoints};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Anomaly flag value that marks an irregular reading
pub const ANOMALY_FLAG: &str = "1";

/// Errors that can occur while fetching feed data
#[derive(Debug, Error)]
pub enum FeedError {
    /// Transport-level failure (DNS, connect, timeout)
    #[error("Network error: {0}")]
    Network(String),
    /// The data service answered with a non-success status
    #[error("Unexpected status {status} from {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL with the read key removed
        url: String,
    },
    /// Body did not match the expected JSON shape
    #[error("Malformed feed data: {0}")]
    Malformed(String),
    /// Fewer usable points than an operation needs
    #[error("Not enough data: need {needed} points, got {got}")]
    InsufficientData {
        /// Minimum number of points required
        needed: usize,
        /// Number of points available
        got: usize,
    },
}

/// A single feed entry as returned by ThingSpeak
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedRecord {
    /// Entry timestamp
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Sequential entry id within the channel
    #[serde(default)]
    pub entry_id: Option<u64>,
    /// Predicted or measured temperature, kept as the raw string
    #[serde(default, deserialize_with = "lenient_string")]
    pub field1: Option<String>,
    /// Anomaly flag ("0" or "1")
    #[serde(default, deserialize_with = "lenient_string")]
    pub field2: Option<String>,
}

/// ThingSpeak stores field values as text but some writers send numbers.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl FeedRecord {
    /// Whether the anomaly flag is raised
    #[must_use]
    pub fn is_anomalous(&self) -> bool {
        self.field2.as_deref().map(str::trim) == Some(ANOMALY_FLAG)
    }

    /// The value parsed as a number, if present and numeric
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        self.field1
            .as_deref()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    fn point(&self, index: usize) -> Result<(DateTime<Utc>, f64), FeedError> {
        let timestamp = self
            .created_at
            .ok_or_else(|| FeedError::Malformed(format!("record {index} has no created_at")))?;
        let value = self.value().ok_or_else(|| {
            FeedError::Malformed(format!(
                "record {index} has non-numeric field1: {:?}",
                self.field1
            ))
        })?;
        Ok((timestamp, value))
    }
}

/// Ordered feed history, most recent entry last
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedSeries {
    /// Records in chronological order
    pub records: Vec<FeedRecord>,
}

impl FeedSeries {
    /// Wrap already-ordered records
    #[must_use]
    pub const fn new(records: Vec<FeedRecord>) -> Self {
        Self { records }
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the series holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Timestamped numeric points.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Malformed` if any record lacks a timestamp or a
    /// numeric `field1`.
    pub fn points(&self) -> Result<Vec<(DateTime<Utc>, f64)>, FeedError> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| r.point(i))
            .collect()
    }

    /// Numeric points, requiring at least `min_len` of them.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::InsufficientData` for short series and
    /// `FeedError::Malformed` for unusable records.
    pub fn points_at_least(&self, min_len: usize) -> Result<Vec<(DateTime<Utc>, f64)>, FeedError> {
        if self.records.len() < min_len {
            return Err(FeedError::InsufficientData {
                needed: min_len,
                got: self.records.len(),
            });
        }
        self.points()
    }
}

/// Latest reading from every configured source
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    /// Latest polynomial prediction
    pub polynomial: FeedRecord,
    /// Latest LSTM prediction
    pub lstm: FeedRecord,
    /// Latest measured value, when a current channel is configured
    pub current: Option<FeedRecord>,
}

/// Feed histories for both prediction sources
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionHistory {
    /// Polynomial prediction series
    pub polynomial: FeedSeries,
    /// LSTM prediction series
    pub lstm: FeedSeries,
}

/// Interface to the external IoT data service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetricsSource: Send + Sync {
    /// Fetch the most recent record of a channel
    async fn latest(&self, channel: &FeedChannel) -> Result<FeedRecord, FeedError>;

    /// Fetch the last `results` records of a channel, oldest first
    async fn history(&self, channel: &FeedChannel, results: u32) -> Result<FeedSeries, FeedError>;
}

/// Fetch the latest record of every configured channel concurrently.
///
/// # Errors
///
/// Returns the first `FeedError` raised by any of the fetches.
pub async fn fetch_snapshot(
    source: &dyn MetricsSource,
    endpoints: &FeedEndpoints,
) -> Result<MetricsSnapshot, FeedError> {
    let current = async {
        match &endpoints.current {
            Some(channel) => source.latest(channel).await.map(Some),
            None => Ok(None),
        }
    };

    let (polynomial, lstm, current) = tokio::try_join!(
        source.latest(&endpoints.polynomial),
        source.latest(&endpoints.lstm),
        current
    )?;

    Ok(MetricsSnapshot {
        polynomial,
        lstm,
        current,
    })
}

/// Fetch both prediction histories concurrently.
///
/// # Errors
///
/// Returns the first `FeedError` raised by either fetch.
pub async fn fetch_histories(
    source: &dyn MetricsSource,
    endpoints: &FeedEndpoints,
) -> Result<PredictionHistory, FeedError> {
    let (polynomial, lstm) = tokio::try_join!(
        source.history(&endpoints.polynomial, endpoints.results),
        source.history(&endpoints.lstm, endpoints.results)
    )?;
    Ok(PredictionHistory { polynomial, lstm })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_settings;
    use chrono::TimeZone;

    fn record(value: Option<&str>, flag: Option<&str>) -> FeedRecord {
        FeedRecord {
            created_at: Some(
                Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0)
                    .single()
                    .expect("valid timestamp"),
            ),
            entry_id: Some(1),
            field1: value.map(ToString::to_string),
            field2: flag.map(ToString::to_string),
        }
    }

    #[test]
    fn test_record_deserializes_strings_numbers_and_nulls() {
        let json = r#"{"created_at":"2025-01-01T12:00:00Z","entry_id":5,"field1":23.5,"field2":null}"#;
        let rec: FeedRecord = serde_json::from_str(json).expect("record parses");
        assert_eq!(rec.field1.as_deref(), Some("23.5"));
        assert_eq!(rec.field2, None);
        assert_eq!(rec.entry_id, Some(5));

        let json = r#"{"created_at":"2025-01-01T12:00:00Z","field1":"21.04"}"#;
        let rec: FeedRecord = serde_json::from_str(json).expect("record parses");
        assert_eq!(rec.value(), Some(21.04));
        assert!(!rec.is_anomalous());
    }

    #[test]
    fn test_anomaly_flag() {
        assert!(record(Some("20"), Some("1")).is_anomalous());
        assert!(!record(Some("20"), Some("0")).is_anomalous());
        assert!(!record(Some("20"), Some("yes")).is_anomalous());
        assert!(!record(Some("20"), None).is_anomalous());
    }

    #[test]
    fn test_value_rejects_non_numeric() {
        assert_eq!(record(Some("abc"), None).value(), None);
        assert_eq!(record(Some("NaN"), None).value(), None);
        assert_eq!(record(None, None).value(), None);
    }

    #[test]
    fn test_points_at_least() {
        let series = FeedSeries::new(vec![record(Some("20.0"), None)]);
        assert!(matches!(
            series.points_at_least(2),
            Err(FeedError::InsufficientData { needed: 2, got: 1 })
        ));

        let series = FeedSeries::new(vec![record(Some("20.0"), None), record(None, None)]);
        assert!(matches!(series.points_at_least(2), Err(FeedError::Malformed(_))));

        let series = FeedSeries::new(vec![record(Some("20.0"), None), record(Some("22"), None)]);
        let points = series.points_at_least(2).expect("two numeric points");
        assert_eq!(points.len(), 2);
        assert!((points[1].1 - 22.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_fetch_snapshot_skips_unconfigured_current() {
        let endpoints = test_settings().feed_endpoints();
        let mut source = MockMetricsSource::new();
        source
            .expect_latest()
            .times(2)
            .returning(|_| Ok(record(Some("20.5"), Some("0"))));

        let snapshot = fetch_snapshot(&source, &endpoints)
            .await
            .expect("snapshot fetched");
        assert!(snapshot.current.is_none());
        assert_eq!(snapshot.polynomial.field1.as_deref(), Some("20.5"));
    }

    #[tokio::test]
    async fn test_fetch_snapshot_propagates_failure() {
        let mut settings = test_settings();
        settings.current_channel_id = Some(99);
        let endpoints = settings.feed_endpoints();

        let mut source = MockMetricsSource::new();
        source.expect_latest().returning(|channel| {
            if channel.channel_id == 99 {
                Err(FeedError::Network("connection refused".to_string()))
            } else {
                Ok(record(Some("20.5"), Some("0")))
            }
        });

        let result = fetch_snapshot(&source, &endpoints).await;
        assert!(matches!(result, Err(FeedError::Network(_))));
    }
}
