//! LLM integration for copy drafting.
//!
//! Uses rig-core's Gemini provider for HTTP transport and the `RigAdapter`
//! to bridge rig's `CompletionModel` trait to our `LlmProvider` trait.

pub mod provider;
mod rig_adapter;

pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{ConfigError, LlmError};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub model: String,
    pub safety: Vec<SafetySetting>,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            model: DEFAULT_MODEL.to_string(),
            safety: SafetySetting::defaults(),
        }
    }

    /// Read `GEMINI_API_KEY`, `FOLIO_MODEL` and `FOLIO_AI_SAFETY`. Returns
    /// `Ok(None)` when no API key is set, which disables drafting.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let Some(api_key) = read("GEMINI_API_KEY") else {
            return Ok(None);
        };
        let mut config = Self::new(api_key);
        if let Some(model) = read("FOLIO_MODEL") {
            config.model = model;
        }
        if let Some(safety) = read("FOLIO_AI_SAFETY") {
            config.safety = SafetySetting::parse_list(&safety)?;
        }
        Ok(Some(config))
    }
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::gemini;

    let client: gemini::Client =
        gemini::Client::new(config.api_key.expose_secret()).map_err(|e| {
            LlmError::RequestFailed {
                provider: "gemini".to_string(),
                reason: format!("Failed to create Gemini client: {e}"),
            }
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!(model = %config.model, "Using Gemini");
    Ok(Arc::new(RigAdapter::new(model, &config.model)))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn no_api_key_disables_drafting() {
        assert!(LlmConfig::from_lookup(lookup(&[])).unwrap().is_none());
        assert!(
            LlmConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")]))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn reads_overrides() {
        let config = LlmConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "secret"),
            ("FOLIO_MODEL", "gemini-pro"),
            ("FOLIO_AI_SAFETY", "none"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(config.api_key.expose_secret(), "secret");
        assert_eq!(config.model, "gemini-pro");
        assert!(
            config
                .safety
                .iter()
                .all(|s| s.threshold == HarmBlockThreshold::BlockNone)
        );
    }

    #[test]
    fn bad_safety_value_is_rejected() {
        let result = LlmConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "secret"),
            ("FOLIO_AI_SAFETY", "whatever"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn create_provider_uses_configured_model() {
        let mut config = LlmConfig::new("test-key");
        config.model = "gemini-test".into();
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "gemini-test");
    }
}
