//! Process configuration, read once from the environment at startup.

use std::path::PathBuf;

use tracing::warn;

use crate::error::ConfigError;
use crate::llm::LlmConfig;
use crate::mail::SmtpConfig;
use crate::pipeline::NotifierConfig;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DB_PATH: &str = "./data/folio.db";
pub const DEFAULT_SITE_NAME: &str = "Portfolio";

/// Server configuration.
#[derive(Debug)]
pub struct AppConfig {
    /// HTTP listen port.
    pub port: u16,
    pub db_path: PathBuf,
    /// Shown in email footers.
    pub site_name: String,
    /// Recipient of admin notifications.
    pub admin_email: Option<String>,
    /// `None` disables AI drafting.
    pub llm: Option<LlmConfig>,
    /// SMTP settings, or why they are unusable. Sending is disabled on error.
    pub smtp: Result<SmtpConfig, ConfigError>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source.
    ///
    /// Only a malformed `FOLIO_AI_SAFETY` is fatal; missing SMTP settings
    /// are kept as an error value and a bad port falls back to the default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match read("FOLIO_PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(value = %raw, default = DEFAULT_PORT, "Invalid FOLIO_PORT, using default");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        Ok(Self {
            port,
            db_path: read("FOLIO_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            site_name: read("FOLIO_SITE_NAME").unwrap_or_else(|| DEFAULT_SITE_NAME.to_string()),
            admin_email: read("ADMIN_EMAIL"),
            llm: LlmConfig::from_lookup(&lookup)?,
            smtp: SmtpConfig::from_lookup(&lookup),
        })
    }

    pub fn notifier(&self) -> NotifierConfig {
        NotifierConfig {
            site_name: self.site_name.clone(),
            admin_email: self.admin_email.clone(),
        }
    }
}
