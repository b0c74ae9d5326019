use super::common::{build_openai_messages, extract_openai_response};
use super::{LlmError, LlmProvider};
use async_openai::{config::OpenAIConfig, types::chat::CreateChatCompletionRequestArgs, Client};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Sampling temperature for chat replies
const CHAT_TEMPERATURE: f32 = 0.7;

/// LLM provider for the OpenAI chat-completion API (or a compatible server)
pub struct OpenAiProvider {
    client: Option<Client<OpenAIConfig>>,
    max_tokens: u32,
}

impl OpenAiProvider {
    /// Create a provider. Without an API key every call fails with
    /// `LlmError::MissingConfig`.
    #[must_use]
    pub fn new(
        api_key: Option<String>,
        api_base: Option<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        let client = api_key.map(|key| {
            let mut config = OpenAIConfig::new().with_api_key(key);
            if let Some(base) = api_base {
                config = config.with_api_base(base);
            }
            let http = build_http_client(timeout);
            Client::with_config(config).with_http_client(http)
        });
        Self { client, max_tokens }
    }
}

/// Timeout-bound HTTP client; falls back to reqwest's defaults if the
/// builder fails.
fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(
                "Failed to build LLM HTTP client with {}s timeout, using defaults: {e}",
                timeout.as_secs()
            );
            reqwest::Client::new()
        })
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat_completion(
        &self,
        system_prompt: &str,
        user_message: &str,
        model_id: &str,
    ) -> Result<String, LlmError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| LlmError::MissingConfig("OPENAI_API_KEY".to_string()))?;

        let messages = build_openai_messages(system_prompt, user_message)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(model_id)
            .messages(messages)
            .max_tokens(self.max_tokens)
            .temperature(CHAT_TEMPERATURE)
            .build()
            .map_err(|e| LlmError::Unknown(e.to_string()))?;

        debug!(model = model_id, "Sending chat completion request");

        let response = client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::ApiError(e.to_string()))?;

        extract_openai_response(&response)
    }
}
