//! Provider-agnostic completion types and the `LlmProvider` trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, LlmError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ── Safety thresholds ───────────────────────────────────────────────

/// Content category a safety threshold applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HarmCategory {
    Harassment,
    HateSpeech,
    SexuallyExplicit,
    DangerousContent,
}

impl HarmCategory {
    pub const ALL: [HarmCategory; 4] = [
        Self::Harassment,
        Self::HateSpeech,
        Self::SexuallyExplicit,
        Self::DangerousContent,
    ];

    /// Wire name used by the provider API.
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::Harassment => "HARM_CATEGORY_HARASSMENT",
            Self::HateSpeech => "HARM_CATEGORY_HATE_SPEECH",
            Self::SexuallyExplicit => "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            Self::DangerousContent => "HARM_CATEGORY_DANGEROUS_CONTENT",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase().replace('-', "_");
        let name = name.strip_prefix("harm_category_").unwrap_or(&name);
        match name {
            "harassment" => Some(Self::Harassment),
            "hate_speech" | "hate" => Some(Self::HateSpeech),
            "sexually_explicit" | "sexual" => Some(Self::SexuallyExplicit),
            "dangerous_content" | "dangerous" => Some(Self::DangerousContent),
            _ => None,
        }
    }
}

/// How aggressively the provider filters a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarmBlockThreshold {
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

impl HarmBlockThreshold {
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::BlockNone => "BLOCK_NONE",
            Self::BlockOnlyHigh => "BLOCK_ONLY_HIGH",
            Self::BlockMediumAndAbove => "BLOCK_MEDIUM_AND_ABOVE",
            Self::BlockLowAndAbove => "BLOCK_LOW_AND_ABOVE",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "block_none" | "none" => Some(Self::BlockNone),
            "block_only_high" | "high" => Some(Self::BlockOnlyHigh),
            "block_medium_and_above" | "medium" => Some(Self::BlockMediumAndAbove),
            "block_low_and_above" | "low" => Some(Self::BlockLowAndAbove),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

impl SafetySetting {
    /// Every category at the same threshold.
    pub fn uniform(threshold: HarmBlockThreshold) -> Vec<SafetySetting> {
        HarmCategory::ALL
            .into_iter()
            .map(|category| SafetySetting {
                category,
                threshold,
            })
            .collect()
    }

    pub fn defaults() -> Vec<SafetySetting> {
        Self::uniform(HarmBlockThreshold::BlockMediumAndAbove)
    }

    /// Parse `FOLIO_AI_SAFETY`.
    ///
    /// Either a single threshold applied to every category (`high`), or
    /// comma-separated `category=threshold` pairs overriding the defaults
    /// (`harassment=none,dangerous=low`).
    pub fn parse_list(raw: &str) -> Result<Vec<SafetySetting>, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::defaults());
        }
        if !raw.contains('=') {
            let threshold = HarmBlockThreshold::parse(raw).ok_or_else(|| invalid(raw))?;
            return Ok(Self::uniform(threshold));
        }

        let mut settings = Self::defaults();
        for pair in raw.split(',').filter(|p| !p.trim().is_empty()) {
            let (category, threshold) = pair.split_once('=').ok_or_else(|| invalid(pair))?;
            let category = HarmCategory::parse(category).ok_or_else(|| invalid(pair))?;
            let threshold = HarmBlockThreshold::parse(threshold).ok_or_else(|| invalid(pair))?;
            for setting in settings.iter_mut().filter(|s| s.category == category) {
                setting.threshold = threshold;
            }
        }
        Ok(settings)
    }
}

fn invalid(value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: "FOLIO_AI_SAFETY".to_string(),
        message: format!("cannot parse safety setting '{}'", value.trim()),
    }
}

// ── Requests and responses ──────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub safety_settings: Vec<SafetySetting>,
    /// Ask the provider for a bare JSON response body.
    pub json_output: bool,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
            safety_settings: Vec::new(),
            json_output: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_safety_settings(mut self, settings: Vec<SafetySetting>) -> Self {
        self.safety_settings = settings;
        self
    }

    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    /// The provider returned no text.
    Unknown,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: FinishReason,
    pub response_id: Option<String>,
}

/// A text-completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn model_name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold_of(settings: &[SafetySetting], category: HarmCategory) -> HarmBlockThreshold {
        settings
            .iter()
            .find(|s| s.category == category)
            .unwrap()
            .threshold
    }

    #[test]
    fn empty_safety_spec_uses_defaults() {
        assert_eq!(SafetySetting::parse_list("  ").unwrap(), SafetySetting::defaults());
    }

    #[test]
    fn single_threshold_applies_everywhere() {
        let settings = SafetySetting::parse_list("BLOCK_ONLY_HIGH").unwrap();
        assert_eq!(settings.len(), 4);
        assert!(
            settings
                .iter()
                .all(|s| s.threshold == HarmBlockThreshold::BlockOnlyHigh)
        );
    }

    #[test]
    fn pairs_override_individual_categories() {
        let settings = SafetySetting::parse_list("harassment=none, dangerous-content=low").unwrap();
        assert_eq!(
            threshold_of(&settings, HarmCategory::Harassment),
            HarmBlockThreshold::BlockNone
        );
        assert_eq!(
            threshold_of(&settings, HarmCategory::DangerousContent),
            HarmBlockThreshold::BlockLowAndAbove
        );
        assert_eq!(
            threshold_of(&settings, HarmCategory::HateSpeech),
            HarmBlockThreshold::BlockMediumAndAbove
        );
    }

    #[test]
    fn bad_safety_spec_is_a_config_error() {
        let err = SafetySetting::parse_list("harassment=sometimes").unwrap_err();
        assert!(err.to_string().contains("FOLIO_AI_SAFETY"));
        assert!(SafetySetting::parse_list("strict").is_err());
    }

    #[test]
    fn request_builder_sets_options() {
        let request = CompletionRequest::new(vec![ChatMessage::user("hi")])
            .with_temperature(0.4)
            .with_max_tokens(256)
            .with_json_output();
        assert_eq!(request.temperature, Some(0.4));
        assert_eq!(request.max_tokens, Some(256));
        assert!(request.json_output);
        assert!(request.safety_settings.is_empty());
    }
}
