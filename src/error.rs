//! Error types for folio.

use std::time::Duration;

/// Configuration-related errors.
///
/// These are permanent until the process is redeployed with a fixed
/// environment and are never retried.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingEnvVars(Vec<String>),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Site content errors.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Unknown content key: {0}")]
    UnknownKey(String),

    #[error("Invalid {key} content: {reason}")]
    Invalid { key: String, reason: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Outbound mail errors.
///
/// The transport never surfaces these to callers directly; they are folded
/// into a [`SendResult`](crate::mail::SendResult) and logged.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    MessageBuild(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),

    #[error("SMTP send task failed: {0}")]
    Task(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Provider {provider} blocked the request: {reason}")]
    Blocked { provider: String, reason: String },
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// AI copy-draft gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid input for {flow}: {}", format_errors(.errors))]
    Validation {
        flow: String,
        errors: Vec<ValidationError>,
    },

    #[error("Generation failed for {flow}: {reason}")]
    Generation { flow: String, reason: String },

    #[error("Unknown draft flow: {0}")]
    UnknownFlow(String),
}

impl GatewayError {
    /// Name of the flow that failed, when known.
    pub fn flow(&self) -> Option<&str> {
        match self {
            Self::Validation { flow, .. } | Self::Generation { flow, .. } => Some(flow),
            Self::UnknownFlow(_) => None,
        }
    }
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_env_vars_lists_every_name() {
        let err = ConfigError::MissingEnvVars(vec!["SMTP_HOST".into(), "SMTP_PORT".into()]);
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: SMTP_HOST, SMTP_PORT"
        );
    }

    #[test]
    fn validation_error_display_joins_fields() {
        let err = GatewayError::Validation {
            flow: "hero_tagline".into(),
            errors: vec![
                ValidationError::new("name", "must not be empty"),
                ValidationError::new("role", "must not be empty"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Invalid input for hero_tagline: name: must not be empty; role: must not be empty"
        );
        assert_eq!(err.flow(), Some("hero_tagline"));
    }
}
