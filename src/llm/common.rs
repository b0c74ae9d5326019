//! Request building and response parsing for OpenAI-compatible APIs

use super::LlmError;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionResponse,
};

/// Build the `[system, user]` message list
///
/// # Errors
///
/// Returns `LlmError::Unknown` if message building fails.
pub fn build_openai_messages(
    system_prompt: &str,
    user_message: &str,
) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
    let mut messages = Vec::with_capacity(2);

    if !system_prompt.is_empty() {
        messages.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()
                .map_err(|e| LlmError::Unknown(e.to_string()))?
                .into(),
        );
    }

    messages.push(
        ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| LlmError::Unknown(e.to_string()))?
            .into(),
    );

    Ok(messages)
}

/// Text of the first choice, unmodified
///
/// Blank content counts as missing: Telegram refuses to send an empty
/// message, so the caller's apology is shown instead.
///
/// # Errors
///
/// Returns `LlmError::EmptyResponse` if there is no choice, no content, or
/// only whitespace.
pub fn extract_openai_response(
    response: &CreateChatCompletionResponse,
) -> Result<String, LlmError> {
    response
        .choices
        .first()
        .and_then(|c| c.message.content.clone())
        .filter(|text| !text.trim().is_empty())
        .ok_or(LlmError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_messages_skips_empty_system_prompt() {
        let messages = build_openai_messages("", "hi").expect("messages build");
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::User(_)));

        let messages = build_openai_messages("sys", "hi").expect("messages build");
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
    }

    #[test]
    fn test_extract_first_choice() {
        let body = serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-3.5-turbo",
            "choices": [
                {
                    "index": 0,
                    "message": {"role": "assistant", "content": "It is warm."},
                    "finish_reason": "stop"
                },
                {
                    "index": 1,
                    "message": {"role": "assistant", "content": "Second."},
                    "finish_reason": "stop"
                }
            ]
        });
        let response: CreateChatCompletionResponse =
            serde_json::from_value(body).expect("response parses");
        assert_eq!(
            extract_openai_response(&response).expect("has content"),
            "It is warm."
        );
    }

    fn single_choice(content: &str) -> CreateChatCompletionResponse {
        let body = serde_json::json!({
            "id": "chatcmpl-2",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-3.5-turbo",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        });
        serde_json::from_value(body).expect("response parses")
    }

    #[test]
    fn test_extract_keeps_content_verbatim() {
        let response = single_choice("  Line one\n\n- item  \n");
        assert_eq!(
            extract_openai_response(&response).expect("has content"),
            "  Line one\n\n- item  \n"
        );
    }

    #[test]
    fn test_extract_blank_content_is_empty_response() {
        let response = single_choice(" \n\t ");
        assert!(matches!(
            extract_openai_response(&response),
            Err(LlmError::EmptyResponse)
        ));
    }

    #[test]
    fn test_extract_empty_choices() {
        let body = serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-3.5-turbo",
            "choices": []
        });
        let response: CreateChatCompletionResponse =
            serde_json::from_value(body).expect("response parses");
        assert!(matches!(
            extract_openai_response(&response),
            Err(LlmError::EmptyResponse)
        ));
    }
}
