//! Reply formatting
//!
//! Turns fetched feed data into Telegram-ready text and chart images.

/// Line chart rendering
pub mod chart;
/// Latest-value status message
pub mod status;
/// Trend delta analysis
pub mod trend;

pub use chart::{render_chart, ChartError, ChartInput, ChartLine};
pub use status::format_status;
pub use trend::{analyze_series, format_delta, format_trend_report, Trend, TrendSummary};

/// Unit appended to every temperature value
pub const TEMPERATURE_UNIT: &str = "°C";

/// Placeholder shown for missing values
pub const MISSING_VALUE: &str = "N/A";
