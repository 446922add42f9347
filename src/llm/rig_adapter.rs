//! Bridges rig's `CompletionModel` to our [`LlmProvider`] trait.
//!
//! Gemini request options rig has no typed field for (safety thresholds and
//! the JSON response MIME type) travel in `additional_params`, which rig's
//! Gemini provider merges into the `generateContent` body.

use async_trait::async_trait;
use rig::completion::{AssistantContent, CompletionError, CompletionModel, Message};
use serde_json::{Map, Value, json};

use crate::error::LlmError;

use super::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role,
};

pub struct RigAdapter<M> {
    model: M,
    model_name: String,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
        }
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let params = additional_params(&request);
        let (preamble, mut history) = split_messages(request.messages);
        let Some(prompt) = history.pop() else {
            return Err(LlmError::RequestFailed {
                provider: self.model_name.clone(),
                reason: "completion request has no user message".to_string(),
            });
        };

        let mut builder = self
            .model
            .completion_request(prompt)
            .messages(history)
            .additional_params(params);
        if let Some(preamble) = preamble {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(u64::from(max_tokens));
        }

        let response = self
            .model
            .completion(builder.build())
            .await
            .map_err(|e| classify_error(&self.model_name, e))?;

        let content = response
            .choice
            .iter()
            .filter_map(|part| match part {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        tracing::debug!(
            model = %self.model_name,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Completion received"
        );

        Ok(CompletionResponse {
            finish_reason: if content.is_empty() {
                FinishReason::Unknown
            } else {
                FinishReason::Stop
            },
            content,
            input_tokens: saturate(response.usage.input_tokens),
            output_tokens: saturate(response.usage.output_tokens),
            response_id: None,
        })
    }
}

/// System messages become the preamble; the rest is chat history in order.
fn split_messages(messages: Vec<ChatMessage>) -> (Option<String>, Vec<Message>) {
    let mut system = Vec::new();
    let mut history = Vec::new();
    for message in messages {
        match message.role {
            Role::System => system.push(message.content),
            Role::User => history.push(Message::user(message.content)),
            Role::Assistant => history.push(Message::assistant(message.content)),
        }
    }
    let preamble = (!system.is_empty()).then(|| system.join("\n\n"));
    (preamble, history)
}

/// `generateContent` fields carried outside rig's typed request.
fn additional_params(request: &CompletionRequest) -> Value {
    let mut generation_config = Map::new();
    if request.json_output {
        generation_config.insert("responseMimeType".into(), json!("application/json"));
    }

    let mut params = json!({ "generationConfig": generation_config });
    if !request.safety_settings.is_empty() {
        params["safetySettings"] = request
            .safety_settings
            .iter()
            .map(|s| {
                json!({
                    "category": s.category.api_name(),
                    "threshold": s.threshold.api_name(),
                })
            })
            .collect();
    }
    params
}

/// Map a rig error onto our variants by the HTTP status it reports.
fn classify_error(provider: &str, error: CompletionError) -> LlmError {
    let reason = error.to_string();
    let provider = provider.to_string();
    if reason.contains("429") || reason.contains("RESOURCE_EXHAUSTED") {
        LlmError::RateLimited {
            provider,
            retry_after: None,
        }
    } else if ["401", "403", "PERMISSION_DENIED", "API_KEY_INVALID"]
        .iter()
        .any(|marker| reason.contains(marker))
    {
        LlmError::AuthFailed { provider }
    } else if ["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST"]
        .iter()
        .any(|marker| reason.contains(marker))
    {
        LlmError::Blocked { provider, reason }
    } else {
        LlmError::RequestFailed { provider, reason }
    }
}

fn saturate(tokens: u64) -> u32 {
    u32::try_from(tokens).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{HarmBlockThreshold, HarmCategory, SafetySetting};

    #[test]
    fn system_messages_become_preamble() {
        let (preamble, history) = split_messages(vec![
            ChatMessage::system("Be brief."),
            ChatMessage::user("Hello"),
            ChatMessage::assistant("Hi"),
            ChatMessage::system("Use JSON."),
            ChatMessage::user("Again"),
        ]);
        assert_eq!(preamble.as_deref(), Some("Be brief.\n\nUse JSON."));
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn no_system_message_means_no_preamble() {
        let (preamble, history) = split_messages(vec![ChatMessage::user("Hello")]);
        assert!(preamble.is_none());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn json_mode_and_safety_go_into_additional_params() {
        let request = CompletionRequest::new(vec![ChatMessage::user("x")])
            .with_json_output()
            .with_safety_settings(vec![SafetySetting {
                category: HarmCategory::Harassment,
                threshold: HarmBlockThreshold::BlockNone,
            }]);
        let params = additional_params(&request);
        assert_eq!(
            params,
            json!({
                "generationConfig": {"responseMimeType": "application/json"},
                "safetySettings": [
                    {"category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_NONE"}
                ]
            })
        );
    }

    #[test]
    fn plain_request_sends_empty_generation_config() {
        let params = additional_params(&CompletionRequest::new(vec![ChatMessage::user("x")]));
        assert_eq!(params, json!({"generationConfig": {}}));
    }

    #[test]
    fn errors_are_classified_by_status() {
        let rate = classify_error(
            "gemini-test",
            CompletionError::ProviderError("429 Too Many Requests".into()),
        );
        assert!(matches!(rate, LlmError::RateLimited { .. }));

        let auth = classify_error(
            "gemini-test",
            CompletionError::ProviderError("403 PERMISSION_DENIED".into()),
        );
        assert!(matches!(auth, LlmError::AuthFailed { .. }));

        let blocked = classify_error(
            "gemini-test",
            CompletionError::ResponseError("prompt blocked: SAFETY".into()),
        );
        assert!(matches!(blocked, LlmError::Blocked { .. }));

        let other = classify_error(
            "gemini-test",
            CompletionError::ProviderError("500 backend error".into()),
        );
        match other {
            LlmError::RequestFailed { provider, reason } => {
                assert_eq!(provider, "gemini-test");
                assert!(reason.contains("backend error"));
            }
            other => panic!("expected RequestFailed, got {other:?}"),
        }
    }

    #[test]
    fn token_counts_saturate() {
        assert_eq!(saturate(12), 12);
        assert_eq!(saturate(u64::MAX), u32::MAX);
    }
}
