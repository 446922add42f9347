use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio::config::AppConfig;
use folio::drafts::DraftGateway;
use folio::llm::create_provider;
use folio::mail::SmtpMailer;
use folio::pipeline::InquiryNotifier;
use folio::store::LibSqlBackend;
use folio::web::{AppState, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let log_dir = std::env::var("FOLIO_LOG_DIR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);
    let _log_guard = init_tracing(log_dir.as_deref());

    let config = AppConfig::from_env().context("Invalid configuration")?;

    eprintln!("folio v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   HTTP: http://0.0.0.0:{}", config.port);
    eprintln!("   Database: {}", config.db_path.display());

    // ── Database ─────────────────────────────────────────────────────
    let kv = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?,
    );

    // ── Mail ─────────────────────────────────────────────────────────
    let notifier_config = config.notifier();
    if notifier_config.admin_email.is_none() {
        tracing::warn!("ADMIN_EMAIL not set; admin notifications are disabled");
    }
    let mailer = Arc::new(SmtpMailer::from_config(config.smtp));
    eprintln!(
        "   Email: {}",
        if mailer.is_configured() { "enabled" } else { "disabled" }
    );
    let notifier = InquiryNotifier::new(mailer, notifier_config);

    // ── AI drafting ──────────────────────────────────────────────────
    let gateway = match &config.llm {
        Some(llm_config) => {
            let provider = create_provider(llm_config)?;
            eprintln!("   Drafts: {}", llm_config.model);
            Some(DraftGateway::new(provider, llm_config.safety.clone()))
        }
        None => {
            tracing::info!("GEMINI_API_KEY not set; AI drafting disabled");
            eprintln!("   Drafts: disabled");
            None
        }
    };

    let app = routes(AppState::new(notifier, kv, gateway));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "HTTP server started");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Log to stderr, and to a daily rolling file when a directory is given.
/// The returned guard flushes the file writer on drop.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "folio.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    guard
}
