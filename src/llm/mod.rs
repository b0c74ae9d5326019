//! LLM bridge
//!
//! Forwards user text to an OpenAI-compatible chat-completion API, optionally
//! prefixed with a summary of the latest sensor readings.

mod common;
mod openai;

pub use openai::OpenAiProvider;

use crate::feeds::{FeedRecord, MetricsSnapshot};
use crate::report::{MISSING_VALUE, TEMPERATURE_UNIT};
use thiserror::Error;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// Error returned by the provider's API (auth, quota, network)
    #[error("API error: {0}")]
    ApiError(String),
    /// Missing provider configuration or API key
    #[error("Missing client/API key: {0}")]
    MissingConfig(String),
    /// The completion carried no text
    #[error("Empty response")]
    EmptyResponse,
    /// Any other unexpected error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Interface for chat-completion providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a single completion for one user message
    async fn chat_completion(
        &self,
        system_prompt: &str,
        user_message: &str,
        model_id: &str,
    ) -> Result<String, LlmError>;
}

fn describe_prediction(label: &str, record: &FeedRecord) -> String {
    let value = record.field1.as_deref().unwrap_or(MISSING_VALUE);
    let anomaly = if record.is_anomalous() {
        "anomaly detected"
    } else {
        "no anomaly"
    };
    format!("{label} model predicts {value} {TEMPERATURE_UNIT} ({anomaly})")
}

/// Natural-language summary of a snapshot for use as LLM context
#[must_use]
pub fn metrics_context(snapshot: &MetricsSnapshot) -> String {
    let mut context = format!(
        "Latest temperature readings: {}; {}",
        describe_prediction("Polynomial", &snapshot.polynomial),
        describe_prediction("LSTM", &snapshot.lstm),
    );
    if let Some(current) = &snapshot.current {
        let value = current.field1.as_deref().unwrap_or(MISSING_VALUE);
        context.push_str(&format!("; measured now {value} {TEMPERATURE_UNIT}"));
    }
    if let Some(at) = snapshot.polynomial.created_at {
        context.push_str(&format!(" (as of {})", at.format("%Y-%m-%d %H:%M UTC")));
    }
    context.push('.');
    context
}

/// System prompt with an optional metrics preamble appended
#[must_use]
pub fn system_prompt_with_context(base: &str, snapshot: Option<&MetricsSnapshot>) -> String {
    match snapshot {
        Some(snapshot) => format!(
            "{base}\n\n{}\nUse these readings when they are relevant to the question.",
            metrics_context(snapshot)
        ),
        None => base.to_string(),
    }
}
