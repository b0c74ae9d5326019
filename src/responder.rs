//! Fetch, format, reply
//!
//! Every operation here returns a [`Reply`] and never an error: external
//! failures are logged with their kind and mapped to a fixed apology.

use crate::config::{FeedEndpoints, Settings, CHART_HEIGHT, CHART_WIDTH};
use crate::feeds::{self, FeedError, MetricsSource, MetricsSnapshot, PredictionHistory};
use crate::llm::{system_prompt_with_context, LlmError, LlmProvider};
use crate::report::{self, ChartError, ChartInput, ChartLine};
use crate::utils::truncate_str;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Apology for a failed status fetch
pub const STATUS_APOLOGY: &str = "❌ Failed to fetch data from ThingSpeak.";
/// Apology for a failed trend analysis
pub const TREND_APOLOGY: &str = "❌ Could not analyze trend.";
/// Apology for a failed chart
pub const CHART_APOLOGY: &str = "❌ Failed to generate chart.";
/// Apology for a failed LLM call
pub const LLM_APOLOGY: &str = "⚠️ ChatGPT failed to respond.";

/// Question used when `/explain` comes without text
pub const DEFAULT_EXPLAIN_QUESTION: &str =
    "Briefly explain the current temperature predictions and whether any anomaly needs attention.";

/// Outgoing message produced by a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Plain text, sent without a parse mode
    Text(String),
    /// Text using Telegram's HTML parse mode
    Html(String),
    /// PNG photo with a caption
    Photo {
        /// Encoded image
        png: Vec<u8>,
        /// Caption shown under the image
        caption: String,
    },
}

impl Reply {
    /// Text of the reply, or the caption for photos
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Text(t) | Self::Html(t) => t,
            Self::Photo { caption, .. } => caption,
        }
    }
}

/// Failure inside a multi-step responder pipeline
#[derive(Debug, Error)]
pub enum ResponderError {
    /// Fetching the series failed
    #[error(transparent)]
    Feed(#[from] FeedError),
    /// Rendering failed
    #[error(transparent)]
    Chart(#[from] ChartError),
    /// The blocking render task died
    #[error("Render task failed: {0}")]
    Task(String),
}

const fn failure_kind(e: &FeedError) -> &'static str {
    match e {
        FeedError::Network(_) => "network",
        FeedError::Status { .. } => "status",
        FeedError::Malformed(_) => "malformed",
        FeedError::InsufficientData { .. } => "insufficient_data",
    }
}

const fn llm_failure_kind(e: &LlmError) -> &'static str {
    match e {
        LlmError::ApiError(_) => "api",
        LlmError::MissingConfig(_) => "missing_config",
        LlmError::EmptyResponse => "empty_response",
        LlmError::Unknown(_) => "unknown",
    }
}

/// Shared, read-only context for all handlers
#[derive(Clone)]
pub struct Responder {
    source: Arc<dyn MetricsSource>,
    llm: Arc<dyn LlmProvider>,
    endpoints: FeedEndpoints,
    settings: Arc<Settings>,
}

impl Responder {
    /// Bundle the collaborators built at startup
    #[must_use]
    pub fn new(
        source: Arc<dyn MetricsSource>,
        llm: Arc<dyn LlmProvider>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            source,
            llm,
            endpoints: settings.feed_endpoints(),
            settings,
        }
    }

    /// Latest predictions and anomaly flags
    pub async fn status(&self) -> Reply {
        match feeds::fetch_snapshot(self.source.as_ref(), &self.endpoints).await {
            Ok(snapshot) => Reply::Html(report::format_status(&snapshot)),
            Err(e) => {
                warn!(kind = failure_kind(&e), "Status fetch failed: {e}");
                Reply::Text(STATUS_APOLOGY.to_string())
            }
        }
    }

    /// Direction of change over the recent feed history
    pub async fn trend(&self) -> Reply {
        let result = match feeds::fetch_histories(self.source.as_ref(), &self.endpoints).await {
            Ok(history) => report::format_trend_report(&history),
            Err(e) => Err(e),
        };
        match result {
            Ok(text) => Reply::Html(text),
            Err(e) => {
                warn!(kind = failure_kind(&e), "Trend analysis failed: {e}");
                Reply::Text(TREND_APOLOGY.to_string())
            }
        }
    }

    /// Line chart of both prediction series
    pub async fn chart(&self) -> Reply {
        match self.build_chart().await {
            Ok(png) => Reply::Photo {
                png,
                caption: "📈 Temperature predictions".to_string(),
            },
            Err(e) => {
                let kind = match &e {
                    ResponderError::Feed(fe) => failure_kind(fe),
                    ResponderError::Chart(ChartError::InsufficientData { .. }) => {
                        "insufficient_data"
                    }
                    ResponderError::Chart(_) | ResponderError::Task(_) => "render",
                };
                warn!(kind, "Chart generation failed: {e}");
                Reply::Text(CHART_APOLOGY.to_string())
            }
        }
    }

    async fn build_chart(&self) -> Result<Vec<u8>, ResponderError> {
        let history = feeds::fetch_histories(self.source.as_ref(), &self.endpoints).await?;

        // The current value is optional decoration; its failure does not fail the chart
        let current = match &self.endpoints.current {
            Some(channel) => match self.source.latest(channel).await {
                Ok(record) => record.value(),
                Err(e) => {
                    warn!(kind = failure_kind(&e), "Current value unavailable for chart: {e}");
                    None
                }
            },
            None => None,
        };

        let input = self.chart_input(&history, current)?;
        tokio::task::spawn_blocking(move || report::render_chart(&input))
            .await
            .map_err(|e| ResponderError::Task(e.to_string()))?
            .map_err(ResponderError::from)
    }

    fn chart_input(
        &self,
        history: &PredictionHistory,
        current: Option<f64>,
    ) -> Result<ChartInput, FeedError> {
        Ok(ChartInput {
            title: "Temperature Predictions".to_string(),
            lines: vec![
                ChartLine {
                    label: self.endpoints.polynomial.label.to_string(),
                    points: history.polynomial.points()?,
                },
                ChartLine {
                    label: self.endpoints.lstm.label.to_string(),
                    points: history.lstm.points()?,
                },
            ],
            current,
            marker: self.settings.chart_current_marker,
            size: (CHART_WIDTH, CHART_HEIGHT),
        })
    }

    /// Free-text chat, with metrics context when enabled in settings
    pub async fn chat(&self, text: &str) -> Reply {
        let snapshot = if self.settings.chat_with_context {
            self.snapshot_for_context().await
        } else {
            None
        };
        self.ask_llm(text, snapshot.as_ref()).await
    }

    /// Answer a question about the latest metrics
    pub async fn explain(&self, question: &str) -> Reply {
        let question = if question.trim().is_empty() {
            DEFAULT_EXPLAIN_QUESTION
        } else {
            question
        };
        let snapshot = self.snapshot_for_context().await;
        self.ask_llm(question, snapshot.as_ref()).await
    }

    async fn snapshot_for_context(&self) -> Option<MetricsSnapshot> {
        match feeds::fetch_snapshot(self.source.as_ref(), &self.endpoints).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(
                    kind = failure_kind(&e),
                    "Metrics context unavailable, answering without it: {e}"
                );
                None
            }
        }
    }

    async fn ask_llm(&self, text: &str, snapshot: Option<&MetricsSnapshot>) -> Reply {
        let system_prompt = system_prompt_with_context(self.settings.system_prompt(), snapshot);
        info!(
            "LLM request (context: {}): '{}'",
            snapshot.is_some(),
            truncate_str(text, 100)
        );

        match self
            .llm
            .chat_completion(&system_prompt, text, &self.settings.openai_model)
            .await
        {
            Ok(reply) => Reply::Text(reply),
            Err(e) => {
                error!(kind = llm_failure_kind(&e), "LLM call failed: {e}");
                Reply::Text(LLM_APOLOGY.to_string())
            }
        }
    }
}
