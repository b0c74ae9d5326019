//! Plain-text routing
//!
//! Commands are matched exactly by teloxide before text reaches this module.
//! Here, unknown slash commands are caught, keywords are checked in a
//! fixed order, and anything else goes to the LLM.

use lazy_regex::regex_is_match;

/// Handler selected for an inbound text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Latest predictions
    Status,
    /// Trend over recent history
    Trend,
    /// Chart image
    Chart,
    /// Inline forecast menu
    Forecast,
    /// Slash command the bot does not know
    UnknownCommand,
    /// Free-text LLM chat
    Chat(String),
}

/// Choose a handler for a non-command text message
#[must_use]
pub fn route_text(text: &str) -> Route {
    if text.trim_start().starts_with('/') {
        Route::UnknownCommand
    } else if regex_is_match!(r"(?i)trend", text) {
        Route::Trend
    } else if regex_is_match!(r"(?i)chart|graph|plot", text) {
        Route::Chart
    } else if regex_is_match!(r"(?i)status|prediction|temp", text) {
        Route::Status
    } else if regex_is_match!(r"(?i)forecast", text) {
        Route::Forecast
    } else {
        Route::Chat(text.to_string())
    }
}

/// Action selected from the forecast menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastAction {
    /// Same as `/status`
    Status,
    /// Same as `/trend`
    Trend,
    /// Same as `/chart`
    Chart,
    /// Same as `/explain` without a question
    Explain,
}

/// Prefix shared by all forecast-menu callback payloads
pub const FORECAST_CALLBACK_PREFIX: &str = "forecast:";

impl ForecastAction {
    /// All actions in menu order
    pub const ALL: [Self; 4] = [Self::Status, Self::Trend, Self::Chart, Self::Explain];

    /// Callback payload for this action
    #[must_use]
    pub const fn callback_data(self) -> &'static str {
        match self {
            Self::Status => "forecast:status",
            Self::Trend => "forecast:trend",
            Self::Chart => "forecast:chart",
            Self::Explain => "forecast:explain",
        }
    }

    /// Parse a callback payload; unknown payloads yield `None`
    #[must_use]
    pub fn from_callback_data(data: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.callback_data() == data)
    }
}
