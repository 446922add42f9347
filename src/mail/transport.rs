//! SMTP transport: one attempt per message, failures reported as values.
//!
//! The transport never panics or returns an error to its caller: every outcome
//! is a [`SendResult`]. Configuration problems and provider failures are
//! logged here with full detail; callers decide how much of it to surface.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart, SinglePart, header::ContentType};
use lettre::transport::smtp::PoolConfig;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{ConfigError, MailError};
use crate::mail::template;

/// Fixed timeout for connect, greeting and socket I/O.
pub const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum pooled SMTP connections.
const POOL_MAX_SIZE: u32 = 4;

// ── Configuration ───────────────────────────────────────────────────

/// SMTP configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// Implicit TLS when true, STARTTLS otherwise.
    pub secure: bool,
    pub from_address: String,
}

impl SmtpConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    ///
    /// `SMTP_HOST`, `SMTP_PORT`, `SMTP_USER`, `SMTP_PASSWORD` and
    /// `EMAIL_FROM` are required; every missing one is reported at once.
    /// `SMTP_SECURE` defaults to `true` on port 465 and `false` elsewhere.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = get("SMTP_HOST");
        let port = get("SMTP_PORT");
        let username = get("SMTP_USER");
        let password = get("SMTP_PASSWORD");
        let from_address = get("EMAIL_FROM");

        let missing: Vec<String> = [
            ("SMTP_HOST", host.is_none()),
            ("SMTP_PORT", port.is_none()),
            ("SMTP_USER", username.is_none()),
            ("SMTP_PASSWORD", password.is_none()),
            ("EMAIL_FROM", from_address.is_none()),
        ]
        .into_iter()
        .filter(|(_, absent)| *absent)
        .map(|(key, _)| key.to_string())
        .collect();

        let (Some(host), Some(port), Some(username), Some(password), Some(from_address)) =
            (host, port, username, password, from_address)
        else {
            return Err(ConfigError::MissingEnvVars(missing));
        };

        let port: u16 = port.parse().map_err(|e| ConfigError::InvalidValue {
            key: "SMTP_PORT".into(),
            message: format!("{port:?} is not a port number: {e}"),
        })?;

        let secure = match get("SMTP_SECURE").as_deref() {
            Some(v) => parse_flag(v).ok_or_else(|| ConfigError::InvalidValue {
                key: "SMTP_SECURE".into(),
                message: format!("expected true or false, got {v:?}"),
            })?,
            None => port == 465,
        };

        Ok(Self {
            host,
            port,
            username,
            password: SecretString::from(password),
            secure,
            from_address,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ── Messages and results ────────────────────────────────────────────

/// A fully rendered email, ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
    pub plain_text_body: String,
}

impl OutboundEmail {
    /// Build an email; the plain-text body is derived from the HTML when absent.
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        html_body: impl Into<String>,
        plain_text_body: Option<String>,
    ) -> Self {
        let html_body = html_body.into();
        let plain_text_body =
            plain_text_body.unwrap_or_else(|| template::plain_text_body(&html_body));
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            html_body,
            plain_text_body,
        }
    }
}

/// Why a send failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// Required SMTP settings are absent or invalid. Permanent.
    Configuration,
    /// The provider rejected the message, timed out, or the message was invalid.
    Provider,
}

/// Outcome of a single send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub failure: Option<SendFailure>,
}

impl SendResult {
    pub fn sent(message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            error: None,
            failure: None,
        }
    }

    pub fn failed(failure: SendFailure, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
            failure: Some(failure),
        }
    }

    pub fn is_configuration_error(&self) -> bool {
        self.failure == Some(SendFailure::Configuration)
    }
}

// ── Transport trait ─────────────────────────────────────────────────

/// Outbound mail seam. Implementations make at most one attempt per call.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver a rendered email.
    async fn deliver(&self, email: OutboundEmail) -> SendResult;

    /// Send an email; the plain-text part is derived from `html` when `text` is `None`.
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        text: Option<&str>,
    ) -> SendResult {
        let email = OutboundEmail::new(to, subject, html, text.map(str::to_string));
        self.deliver(email).await
    }
}

// ── SMTP implementation ─────────────────────────────────────────────

/// lettre-backed SMTP transport with a lazily built connection pool.
pub struct SmtpMailer {
    config: Result<SmtpConfig, String>,
    transport: OnceCell<SmtpTransport>,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self {
            config: Ok(config),
            transport: OnceCell::new(),
        }
    }

    /// Build from the environment. Missing settings disable sending but are
    /// not fatal: every send then fails fast with a configuration error.
    pub fn from_env() -> Self {
        Self::from_config(SmtpConfig::from_env())
    }

    /// Build from an already-read configuration result, logging which case applies.
    pub fn from_config(config: Result<SmtpConfig, ConfigError>) -> Self {
        match config {
            Ok(config) => {
                info!(
                    host = %config.host,
                    port = config.port,
                    secure = config.secure,
                    "SMTP configured"
                );
                Self::new(config)
            }
            Err(e) => {
                warn!(error = %e, "SMTP not configured; outbound email disabled");
                Self::unconfigured(e)
            }
        }
    }

    /// A mailer that refuses every send with the given configuration error.
    pub fn unconfigured(error: ConfigError) -> Self {
        Self {
            config: Err(error.to_string()),
            transport: OnceCell::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_ok()
    }

    async fn transport(&self, config: &SmtpConfig) -> Result<SmtpTransport, MailError> {
        self.transport
            .get_or_try_init(|| async { build_transport(config) })
            .await
            .cloned()
    }

    async fn try_deliver(
        &self,
        config: &SmtpConfig,
        email: &OutboundEmail,
    ) -> Result<String, MailError> {
        let (message, message_id) = build_message(config, email)?;
        let transport = self.transport(config).await?;

        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| MailError::Task(e.to_string()))?
            .map_err(|e| MailError::Transport(e.to_string()))?;

        Ok(message_id)
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(&self, email: OutboundEmail) -> SendResult {
        let config = match &self.config {
            Ok(config) => config,
            Err(reason) => {
                error!(
                    to = %email.recipient,
                    subject = %email.subject,
                    reason = %reason,
                    "Email not sent: SMTP is not configured"
                );
                return SendResult::failed(
                    SendFailure::Configuration,
                    format!("SMTP is not configured: {reason}"),
                );
            }
        };

        match self.try_deliver(config, &email).await {
            Ok(message_id) => {
                info!(
                    to = %email.recipient,
                    subject = %email.subject,
                    message_id = %message_id,
                    "Email sent"
                );
                SendResult::sent(message_id)
            }
            Err(e) => {
                error!(
                    to = %email.recipient,
                    subject = %email.subject,
                    host = %config.host,
                    error = %e,
                    "Email send failed"
                );
                SendResult::failed(SendFailure::Provider, e.to_string())
            }
        }
    }
}

fn build_transport(config: &SmtpConfig) -> Result<SmtpTransport, MailError> {
    let credentials = Credentials::new(
        config.username.clone(),
        config.password.expose_secret().to_string(),
    );

    let builder = if config.secure {
        SmtpTransport::relay(&config.host)
    } else {
        SmtpTransport::starttls_relay(&config.host)
    }
    .map_err(|e| MailError::Transport(format!("SMTP relay error: {e}")))?;

    debug!(host = %config.host, port = config.port, "Building pooled SMTP transport");

    Ok(builder
        .port(config.port)
        .credentials(credentials)
        .timeout(Some(SMTP_TIMEOUT))
        .pool_config(PoolConfig::new().max_size(POOL_MAX_SIZE))
        .build())
}

fn build_message(
    config: &SmtpConfig,
    email: &OutboundEmail,
) -> Result<(Message, String), MailError> {
    let from: Mailbox = config
        .from_address
        .parse()
        .map_err(|e| MailError::InvalidAddress {
            address: config.from_address.clone(),
            reason: format!("{e}"),
        })?;
    let to: Mailbox = email
        .recipient
        .parse()
        .map_err(|e| MailError::InvalidAddress {
            address: email.recipient.clone(),
            reason: format!("{e}"),
        })?;

    let domain = from.email.domain().to_string();
    let message_id = format!("<{}@{}>", Uuid::new_v4(), domain);

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.as_str())
        .message_id(Some(message_id.clone()))
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(email.plain_text_body.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(email.html_body.clone()),
                ),
        )
        .map_err(|e| MailError::MessageBuild(e.to_string()))?;

    Ok((message, message_id))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("SMTP_HOST", "smtp.test.com"),
            ("SMTP_PORT", "587"),
            ("SMTP_USER", "user"),
            ("SMTP_PASSWORD", "pass"),
            ("EMAIL_FROM", "Folio <hello@test.com>"),
        ])
    }

    fn lookup<'a>(
        env: &'a HashMap<&'static str, &'static str>,
    ) -> impl Fn(&str) -> Option<String> + 'a {
        move |key: &str| env.get(key).map(|v| v.to_string())
    }

    fn test_config() -> SmtpConfig {
        SmtpConfig::from_lookup(lookup(&full_env())).unwrap()
    }

    // ── Config ──────────────────────────────────────────────────────

    #[test]
    fn config_from_full_env() {
        let config = test_config();
        assert_eq!(config.host, "smtp.test.com");
        assert_eq!(config.port, 587);
        assert_eq!(config.username, "user");
        assert_eq!(config.password.expose_secret(), "pass");
        assert!(!config.secure);
    }

    #[test]
    fn config_reports_every_missing_variable() {
        let mut env = full_env();
        env.remove("SMTP_HOST");
        env.remove("EMAIL_FROM");
        let err = SmtpConfig::from_lookup(lookup(&env)).unwrap_err();
        match err {
            ConfigError::MissingEnvVars(vars) => {
                assert_eq!(vars, vec!["SMTP_HOST".to_string(), "EMAIL_FROM".to_string()]);
            }
            other => panic!("expected MissingEnvVars, got {other:?}"),
        }
    }

    #[test]
    fn config_treats_blank_values_as_missing() {
        let mut env = full_env();
        env.insert("SMTP_PASSWORD", "   ");
        assert!(matches!(
            SmtpConfig::from_lookup(lookup(&env)),
            Err(ConfigError::MissingEnvVars(_))
        ));
    }

    #[test]
    fn config_rejects_bad_port() {
        let mut env = full_env();
        env.insert("SMTP_PORT", "smtp");
        assert!(matches!(
            SmtpConfig::from_lookup(lookup(&env)),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn config_secure_flag() {
        let mut env = full_env();
        env.insert("SMTP_PORT", "465");
        assert!(SmtpConfig::from_lookup(lookup(&env)).unwrap().secure);

        env.insert("SMTP_SECURE", "false");
        assert!(!SmtpConfig::from_lookup(lookup(&env)).unwrap().secure);

        env.insert("SMTP_SECURE", "maybe");
        assert!(SmtpConfig::from_lookup(lookup(&env)).is_err());
    }

    // ── Sending ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn unconfigured_mailer_fails_fast() {
        let mut env = full_env();
        env.remove("SMTP_HOST");
        let err = SmtpConfig::from_lookup(lookup(&env)).unwrap_err();
        let mailer = SmtpMailer::unconfigured(err);
        assert!(!mailer.is_configured());

        let result = mailer
            .send_email("jane@x.com", "Hello", "<p>Hi</p>", None)
            .await;
        assert!(!result.success);
        assert!(result.is_configuration_error());
        assert!(result.message_id.is_none());
        assert!(result.error.unwrap().contains("SMTP_HOST"));
    }

    #[tokio::test]
    async fn invalid_recipient_is_a_provider_failure() {
        let mailer = SmtpMailer::new(test_config());
        let result = mailer
            .send_email("not an address", "Hello", "<p>Hi</p>", None)
            .await;
        assert!(!result.success);
        assert_eq!(result.failure, Some(SendFailure::Provider));
        assert!(result.error.unwrap().contains("not an address"));
    }

    #[test]
    fn outbound_email_derives_plain_text() {
        let email = OutboundEmail::new("a@b.com", "S", "<p>Hello<br>there</p>", None);
        assert_eq!(email.plain_text_body, "Hello\nthere");

        let email = OutboundEmail::new("a@b.com", "S", "<p>x</p>", Some("custom".into()));
        assert_eq!(email.plain_text_body, "custom");
    }

    #[test]
    fn derived_plain_text_is_unescaped() {
        let email = OutboundEmail::new("a@b.com", "S", "<p>Tom &amp; Jerry&#x27;s</p>", None);
        assert_eq!(email.plain_text_body, "Tom & Jerry's");
    }

    #[test]
    fn build_message_sets_message_id_from_sender_domain() {
        let config = test_config();
        let email = OutboundEmail::new("jane@x.com", "Hello", "<p>Hi</p>", None);
        let (_message, id) = build_message(&config, &email).unwrap();
        assert!(id.starts_with('<'));
        assert!(id.ends_with("@test.com>"));
    }

    #[test]
    fn send_result_serializes_without_empty_fields() {
        let json = serde_json::to_value(SendResult::sent("<id@x>")).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "messageId": "<id@x>"}));

        let json =
            serde_json::to_value(SendResult::failed(SendFailure::Provider, "boom")).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "boom"}));
    }
}
