//! AI copy drafting for the admin panel and inquiry form.
//!
//! Each [`DraftFlow`] pairs a typed input with a typed output and a prompt
//! template. [`DraftGateway::run`] validates the input, makes exactly one
//! provider call in JSON mode, and validates what comes back. Nothing is
//! persisted and nothing is retried.

pub mod blocks;
pub mod flows;

pub use blocks::{ContentBlockDraft, ContentBlockRequest, DraftKind};
pub use flows::*;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::error::{GatewayError, ValidationError};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider, SafetySetting};
use crate::mail::template::{TemplateVars, fill};

const SYSTEM_PROMPT: &str = "You write website copy for a small independent web studio. \
Write in plain, warm, professional English. Never invent prices, client names or statistics.";

const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Field-level checks on a flow's input or output.
pub trait Validate {
    fn validate(&self) -> Result<(), Vec<ValidationError>>;
}

/// One kind of draft.
pub trait DraftFlow {
    /// Stable flow name, used in errors, logs and URLs.
    const NAME: &'static str;
    /// Prompt with `{{placeholders}}` filled from [`DraftFlow::prompt_vars`].
    const PROMPT: &'static str;
    /// JSON shape the model is told to produce.
    const OUTPUT_SHAPE: &'static str;
    const TEMPERATURE: f32 = 0.7;

    type Input: DeserializeOwned + Serialize + Validate + Send + Sync;
    type Output: DeserializeOwned + Serialize + Validate + Send;

    fn prompt_vars(input: &Self::Input) -> TemplateVars;

    /// Answer without calling the provider.
    fn short_circuit(_input: &Self::Input) -> Option<Self::Output> {
        None
    }
}

/// Runs draft flows against one provider with fixed safety thresholds.
#[derive(Clone)]
pub struct DraftGateway {
    llm: Arc<dyn LlmProvider>,
    safety: Vec<SafetySetting>,
}

impl DraftGateway {
    pub fn new(llm: Arc<dyn LlmProvider>, safety: Vec<SafetySetting>) -> Self {
        Self { llm, safety }
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    pub async fn run<F: DraftFlow>(&self, input: F::Input) -> Result<F::Output, GatewayError> {
        input.validate().map_err(|errors| GatewayError::Validation {
            flow: F::NAME.to_string(),
            errors,
        })?;

        if let Some(output) = F::short_circuit(&input) {
            info!(flow = F::NAME, "Draft answered without provider call");
            return Ok(output);
        }

        let prompt = fill(F::PROMPT, &F::prompt_vars(&input));
        let system = format!(
            "{SYSTEM_PROMPT}\n\n\
             Respond with a single JSON object of this shape and nothing else:\n{}",
            F::OUTPUT_SHAPE
        );
        let messages = vec![ChatMessage::system(system), ChatMessage::user(prompt)];
        let request = CompletionRequest::new(messages)
            .with_temperature(F::TEMPERATURE)
            .with_max_tokens(DEFAULT_MAX_TOKENS)
            .with_safety_settings(self.safety.clone())
            .with_json_output();

        let response = self.llm.complete(request).await.map_err(|e| {
            warn!(flow = F::NAME, error = %e, "Draft provider call failed");
            generation::<F>(e.to_string())
        })?;

        let json = extract_json_object(&response.content);
        let output: F::Output = serde_json::from_str(&json).map_err(|e| {
            warn!(
                flow = F::NAME,
                error = %e,
                response = response.content.as_str(),
                "Failed to parse draft output"
            );
            generation::<F>(format!("model returned malformed JSON: {e}"))
        })?;

        output.validate().map_err(|errors| {
            let detail = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            warn!(flow = F::NAME, %detail, "Draft output failed validation");
            generation::<F>(format!("model output failed validation: {detail}"))
        })?;

        info!(
            flow = F::NAME,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Draft generated"
        );
        Ok(output)
    }
}

fn generation<F: DraftFlow>(reason: String) -> GatewayError {
    GatewayError::Generation {
        flow: F::NAME.to_string(),
        reason,
    }
}

/// Extract a JSON object from model output that might carry markdown
/// fences or surrounding prose.
pub fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if end > start {
            return trimmed[start..=end].to_string();
        }
    }

    trimmed.to_string()
}

// ── Validation helpers ──────────────────────────────────────────────

/// Accumulates field errors so callers see every problem at once.
#[derive(Debug, Default)]
pub struct Checks {
    errors: Vec<ValidationError>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, field: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            self.errors.push(ValidationError::new(field, "must not be empty"));
        }
        self
    }

    pub fn max_chars(mut self, field: &str, value: &str, max: usize) -> Self {
        let len = value.chars().count();
        if len > max {
            self.errors.push(ValidationError::new(
                field,
                format!("must be at most {max} characters (got {len})"),
            ));
        }
        self
    }

    pub fn non_empty_list<T: AsRef<str>>(mut self, field: &str, items: &[T]) -> Self {
        if items.iter().all(|item| item.as_ref().trim().is_empty()) {
            self.errors.push(ValidationError::new(field, "must contain at least one entry"));
        }
        self
    }

    pub fn range(mut self, field: &str, value: u32, min: u32, max: u32) -> Self {
        if !(min..=max).contains(&value) {
            self.errors.push(ValidationError::new(
                field,
                format!("must be between {min} and {max}"),
            ));
        }
        self
    }

    pub fn finish(self) -> Result<(), Vec<ValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::llm::Role;

    #[test]
    fn extract_handles_fences_and_prose() {
        assert_eq!(extract_json_object(r#" {"a":1} "#), r#"{"a":1}"#);
        assert_eq!(
            extract_json_object("```json\n{\"a\":1}\n```"),
            r#"{"a":1}"#
        );
        assert_eq!(extract_json_object("```\n{\"a\":1}\n```"), r#"{"a":1}"#);
        assert_eq!(
            extract_json_object("Sure! Here you go: {\"a\":{\"b\":2}} Enjoy."),
            r#"{"a":{"b":2}}"#
        );
        assert_eq!(extract_json_object("no json"), "no json");
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_provider() {
        let llm = ScriptedLlm::replying("{}");
        let err = gateway(llm.clone())
            .run::<HeroTagline>(HeroTaglineInput {
                name: " ".into(),
                role: "".into(),
                specialty: None,
            })
            .await
            .unwrap_err();
        match err {
            GatewayError::Validation { flow, errors } => {
                assert_eq!(flow, "hero_tagline");
                assert_eq!(errors.len(), 2);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn request_carries_prompt_safety_and_json_mode() {
        let llm = ScriptedLlm::replying(
            r#"{"headline": "Websites for bakers", "subheadline": "Fresh sites, daily."}"#,
        );
        let out = gateway(llm.clone())
            .run::<HeroTagline>(HeroTaglineInput {
                name: "Ann".into(),
                role: "Web designer".into(),
                specialty: Some("bakeries".into()),
            })
            .await
            .unwrap();
        assert_eq!(out.headline, "Websites for bakers");

        let requests = llm.requests.lock().unwrap();
        let request = &requests[0];
        assert!(request.json_output);
        assert_eq!(request.safety_settings, SafetySetting::defaults());
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[0].content.contains("\"headline\""));
        let prompt = &request.messages[1].content;
        assert!(prompt.contains("Ann") && prompt.contains("bakeries"));
        assert!(!prompt.contains("{{"));
    }

    #[tokio::test]
    async fn fenced_output_is_accepted() {
        let llm = ScriptedLlm::replying("```json\n{\"quote\": \"Great work.\"}\n```");
        let out = gateway(llm)
            .run::<TestimonialPolish>(TestimonialPolishInput {
                name: None,
                raw_text: "great work!!".into(),
            })
            .await
            .unwrap();
        assert_eq!(out.quote, "Great work.");
    }

    #[tokio::test]
    async fn malformed_output_is_a_generation_error() {
        let llm = ScriptedLlm::replying("I cannot help with that.");
        let err = gateway(llm)
            .run::<TestimonialPolish>(TestimonialPolishInput {
                name: None,
                raw_text: "ok".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Generation { ref flow, .. } if flow == "testimonial_polish"
        ));
        assert!(err.to_string().contains("malformed JSON"));
    }

    #[tokio::test]
    async fn provider_failure_is_wrapped_with_flow() {
        let llm = ScriptedLlm::failing("upstream 500");
        let err = gateway(llm.clone())
            .run::<TestimonialPolish>(TestimonialPolishInput {
                name: Some("Bo".into()),
                raw_text: "nice".into(),
            })
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("testimonial_polish") && text.contains("upstream 500"));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn invalid_output_is_a_generation_error() {
        let llm = ScriptedLlm::replying(r#"{"quote": "   "}"#);
        let err = gateway(llm)
            .run::<TestimonialPolish>(TestimonialPolishInput {
                name: None,
                raw_text: "ok".into(),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed validation"));
    }

    #[test]
    fn checks_collect_every_failure() {
        let errors = Checks::new()
            .required("a", "")
            .max_chars("b", "abcdef", 3)
            .non_empty_list("c", &[" "])
            .range("d", 0, 1, 5)
            .finish()
            .unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["a", "b", "c", "d"]);
        assert!(Checks::new().required("a", "x").finish().is_ok());
    }
}
