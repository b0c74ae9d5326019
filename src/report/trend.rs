use super::TEMPERATURE_UNIT;
use crate::feeds::{FeedError, FeedSeries, PredictionHistory};
use std::fmt;

/// Fewest points a series needs before a delta is meaningful
pub const MIN_TREND_POINTS: usize = 2;

/// Direction of change across a series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    /// Last value above the first
    Rising,
    /// Last value below the first
    Falling,
    /// No change
    Stable,
}

impl Trend {
    /// Classify a signed delta
    #[must_use]
    pub fn from_delta(delta: f64) -> Self {
        if delta > 0.0 {
            Self::Rising
        } else if delta < 0.0 {
            Self::Falling
        } else {
            Self::Stable
        }
    }

    const fn icon(self) -> &'static str {
        match self {
            Self::Rising => "⬆️",
            Self::Falling => "⬇️",
            Self::Stable => "➡️",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rising => "Rising",
            Self::Falling => "Falling",
            Self::Stable => "Stable",
        };
        f.write_str(name)
    }
}

/// Result of comparing the first and last point of a series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendSummary {
    /// `last - first`
    pub delta: f64,
    /// Sign classification of `delta`
    pub trend: Trend,
}

/// Compare first and last values of a series.
///
/// # Errors
///
/// Returns `FeedError::InsufficientData` for series shorter than
/// [`MIN_TREND_POINTS`] and `FeedError::Malformed` for non-numeric records.
pub fn analyze_series(series: &FeedSeries) -> Result<TrendSummary, FeedError> {
    let points = series.points_at_least(MIN_TREND_POINTS)?;
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first.1, last.1),
        _ => {
            return Err(FeedError::InsufficientData {
                needed: MIN_TREND_POINTS,
                got: 0,
            })
        }
    };
    let delta = last - first;
    Ok(TrendSummary {
        delta,
        trend: Trend::from_delta(delta),
    })
}

/// Delta with explicit sign and two decimals, e.g. `+2.00 °C (Rising)`
#[must_use]
pub fn format_delta(summary: &TrendSummary) -> String {
    // Avoid "-0.00" for tiny negative deltas
    let shown = if summary.delta.abs() < 0.005 {
        summary.delta.abs()
    } else {
        summary.delta
    };
    format!("{shown:+.2} {TEMPERATURE_UNIT} ({})", summary.trend)
}

/// Analyze both prediction series and render the trend message (HTML).
///
/// # Errors
///
/// Fails if either series cannot be analyzed.
pub fn format_trend_report(history: &PredictionHistory) -> Result<String, FeedError> {
    let polynomial = analyze_series(&history.polynomial)?;
    let lstm = analyze_series(&history.lstm)?;

    Ok(format!(
        "📊 <b>Temperature Trend</b> (last {} readings)\n\n\
         {} <b>Polynomial</b>: {}\n\
         {} <b>LSTM</b>: {}\n",
        history.polynomial.len().min(history.lstm.len()),
        polynomial.trend.icon(),
        format_delta(&polynomial),
        lstm.trend.icon(),
        format_delta(&lstm),
    ))
}
