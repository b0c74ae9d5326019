//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines
//! the fixed feed endpoints used by the bot.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default ThingSpeak API root
pub const DEFAULT_THINGSPEAK_BASE_URL: &str = "https://api.thingspeak.com";
/// Channel carrying the polynomial-regression predictions
pub const DEFAULT_POLY_CHANNEL_ID: u64 = 2_749_134;
/// Channel carrying the LSTM predictions
pub const DEFAULT_LSTM_CHANNEL_ID: u64 = 2_796_258;
/// Number of records requested from the feed-history endpoints
pub const DEFAULT_FEED_RESULTS: u32 = 10;
/// Smallest history size that still yields a trend or a chart
pub const MIN_FEED_RESULTS: u32 = 2;
/// Chat-completion model used for all LLM calls
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
/// Output token cap for LLM replies
pub const DEFAULT_LLM_MAX_TOKENS: u32 = 1024;
/// Timeout for outbound HTTP requests, in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
/// System prompt used when none is configured
pub const DEFAULT_SYSTEM_MESSAGE: &str =
    "You are TempCast, a helpful assistant for temperature forecasts.";

/// Chart image size in pixels
pub const CHART_WIDTH: u32 = 1000;
/// Chart image height in pixels
pub const CHART_HEIGHT: u32 = 600;

/// How the current measured value is drawn on the chart
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CurrentMarker {
    /// Horizontal reference line across the whole time range
    #[default]
    Line,
    /// Single highlighted point at the most recent timestamp
    Point,
}

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// `OpenAI` API key
    pub openai_api_key: Option<String>,
    /// Alternative OpenAI-compatible API base URL
    pub openai_api_base: Option<String>,
    /// Model identifier sent with every completion request
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// Maximum output tokens per completion
    #[serde(default = "default_llm_max_tokens")]
    pub llm_max_tokens: u32,
    /// System prompt for free-text chat
    pub system_message: Option<String>,
    /// Attach the latest metrics to free-text chat as well as `/explain`
    #[serde(default)]
    pub chat_with_context: bool,

    /// ThingSpeak API root
    #[serde(default = "default_thingspeak_base_url")]
    pub thingspeak_base_url: String,
    /// Polynomial prediction channel
    #[serde(default = "default_poly_channel_id")]
    pub poly_channel_id: u64,
    /// Read key for the polynomial channel
    pub poly_read_key: Option<String>,
    /// LSTM prediction channel
    #[serde(default = "default_lstm_channel_id")]
    pub lstm_channel_id: u64,
    /// Read key for the LSTM channel
    pub lstm_read_key: Option<String>,
    /// Channel carrying the measured temperature, if any
    pub current_channel_id: Option<u64>,
    /// Read key for the current-value channel
    pub current_read_key: Option<String>,
    /// Number of records fetched for trend and chart
    #[serde(default = "default_feed_results")]
    pub feed_results: u32,

    /// Timeout for ThingSpeak and LLM HTTP requests
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Marker style for the current value on charts
    #[serde(default)]
    pub chart_current_marker: CurrentMarker,
}

fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.to_string()
}

const fn default_llm_max_tokens() -> u32 {
    DEFAULT_LLM_MAX_TOKENS
}

fn default_thingspeak_base_url() -> String {
    DEFAULT_THINGSPEAK_BASE_URL.to_string()
}

const fn default_poly_channel_id() -> u64 {
    DEFAULT_POLY_CHANNEL_ID
}

const fn default_lstm_channel_id() -> u64 {
    DEFAULT_LSTM_CHANNEL_ID
}

const fn default_feed_results() -> u32 {
    DEFAULT_FEED_RESULTS
}

const fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

/// A ThingSpeak channel together with its display label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedChannel {
    /// Human-readable name used in replies and chart legends
    pub label: &'static str,
    /// Numeric channel id
    pub channel_id: u64,
    /// Read API key, required for private channels
    pub read_key: Option<String>,
}

impl FeedChannel {
    /// Create a channel descriptor
    #[must_use]
    pub fn new(label: &'static str, channel_id: u64, read_key: Option<String>) -> Self {
        Self {
            label,
            channel_id,
            read_key,
        }
    }
}

/// The fixed set of feeds the bot reads from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoints {
    /// Polynomial-regression predictions
    pub polynomial: FeedChannel,
    /// LSTM predictions
    pub lstm: FeedChannel,
    /// Measured value, when configured
    pub current: Option<FeedChannel>,
    /// Records per history request
    pub results: u32,
}

/// Build the layered configuration source.
///
/// # Errors
///
/// Returns a `ConfigError` if any configured source fails to load.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Local overrides, not checked into git
        .add_source(File::with_name("config/local").required(false))
        // Eg. `APP__FEED_RESULTS=20 ./tempcast-bot`
        .add_source(Environment::with_prefix("APP").separator("__"))
        // Plain UPPER_SNAKE_CASE variables map onto snake_case keys
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tempcast_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or `telegram_token` is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let mut settings: Self = build_config()?.try_deserialize()?;

        // Empty read keys mean a public channel
        for key in [
            &mut settings.poly_read_key,
            &mut settings.lstm_read_key,
            &mut settings.current_read_key,
            &mut settings.openai_api_key,
            &mut settings.openai_api_base,
        ] {
            if key.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *key = None;
            }
        }

        if settings.telegram_token.trim().is_empty() {
            return Err(ConfigError::Message(
                "telegram_token must not be empty".to_string(),
            ));
        }

        Ok(settings)
    }

    /// Feed channels resolved from the loaded settings
    #[must_use]
    pub fn feed_endpoints(&self) -> FeedEndpoints {
        FeedEndpoints {
            polynomial: FeedChannel::new(
                "Polynomial",
                self.poly_channel_id,
                self.poly_read_key.clone(),
            ),
            lstm: FeedChannel::new("LSTM", self.lstm_channel_id, self.lstm_read_key.clone()),
            current: self.current_channel_id.map(|id| {
                FeedChannel::new("Current", id, self.current_read_key.clone())
            }),
            results: self.feed_results.max(MIN_FEED_RESULTS),
        }
    }

    /// System prompt for LLM calls
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        self.system_message
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SYSTEM_MESSAGE)
    }

    /// Outbound HTTP timeout
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[cfg(test)]
pub(crate) fn test_settings() -> Settings {
    Settings {
        telegram_token: "dummy".to_string(),
        openai_api_key: None,
        openai_api_base: None,
        openai_model: default_openai_model(),
        llm_max_tokens: DEFAULT_LLM_MAX_TOKENS,
        system_message: None,
        chat_with_context: false,
        thingspeak_base_url: default_thingspeak_base_url(),
        poly_channel_id: DEFAULT_POLY_CHANNEL_ID,
        poly_read_key: None,
        lstm_channel_id: DEFAULT_LSTM_CHANNEL_ID,
        lstm_read_key: None,
        current_channel_id: None,
        current_read_key: None,
        feed_results: DEFAULT_FEED_RESULTS,
        http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        chart_current_marker: CurrentMarker::Line,
    }
}
