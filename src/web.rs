//! HTTP endpoints used by the site's forms and admin panel.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::drafts::{ContentBlockRequest, DraftGateway, DraftKind};
use crate::error::{ContentError, GatewayError};
use crate::pipeline::{Inquiry, InquiryNotifier};
use crate::store::{AdminMessage, ContentKey, ContentStore, KeyValueStore, MessageLedger};

/// Shown to visitors when a submission cannot be processed.
const SUBMIT_FAILED: &str = "Sorry, we couldn't send your message. Please try again later.";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub notifier: Arc<InquiryNotifier>,
    pub ledger: MessageLedger,
    pub content: ContentStore,
    /// `None` when no AI provider is configured.
    pub gateway: Option<DraftGateway>,
}

impl AppState {
    pub fn new(
        notifier: InquiryNotifier,
        kv: Arc<dyn KeyValueStore>,
        gateway: Option<DraftGateway>,
    ) -> Self {
        let content = ContentStore::new(kv);
        Self {
            notifier: Arc::new(notifier),
            ledger: MessageLedger::new(content.clone()),
            content,
            gateway,
        }
    }
}

/// Build the router with every route and permissive CORS.
pub fn routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/contact", post(submit_contact))
        .route("/api/inquiries", post(submit_inquiry))
        .route(
            "/api/messages",
            get(list_messages).post(add_message).delete(clear_messages),
        )
        .route("/api/messages/{id}", delete(remove_message))
        .route(
            "/api/content/{key}",
            get(get_content).put(put_content).delete(reset_content),
        )
        .route("/api/drafts/block", post(draft_block))
        .route("/api/drafts/{flow}", post(draft_flow))
        .layer(cors)
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn storage_error(e: impl std::fmt::Display) -> Response {
    error!(error = %e, "Storage failure");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Storage error")
}

// ── Health ──────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "folio",
        "drafts": state.gateway.is_some(),
    }))
}

// ── Form submissions ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ContactForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InquiryForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    message: String,
    project_title: Option<String>,
    client_project_idea: Option<String>,
    ai_generated_ideas: Option<Vec<String>>,
}

impl From<InquiryForm> for Inquiry {
    fn from(form: InquiryForm) -> Self {
        let mut inquiry = Inquiry::project(form.name, form.email, form.message);
        inquiry.project_title = form.project_title;
        inquiry.client_project_idea = form.client_project_idea;
        inquiry.ai_generated_ideas = form.ai_generated_ideas;
        inquiry
    }
}

/// What a visitor's browser sees. Transport details stay in the logs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    admin_email_failed: bool,
}

async fn submit_contact(State(state): State<AppState>, Json(form): Json<ContactForm>) -> Response {
    submit(state, Inquiry::contact(form.name, form.email, form.message)).await
}

async fn submit_inquiry(State(state): State<AppState>, Json(form): Json<InquiryForm>) -> Response {
    submit(state, form.into()).await
}

async fn submit(state: AppState, inquiry: Inquiry) -> Response {
    if let Err(errors) = inquiry.validate() {
        let detail = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(SubmitResponse {
                success: false,
                error: Some(format!("Please check your details: {detail}")),
                admin_email_failed: false,
            }),
        )
            .into_response();
    }

    let templates = match state.content.template_set().await {
        Ok(templates) => templates,
        Err(e) => {
            warn!(error = %e, "Could not load email templates, using built-ins");
            crate::mail::TemplateSet::builtin()
        }
    };

    let outcome = state.notifier.notify_with(&templates, &inquiry).await;
    if !outcome.success {
        warn!(error = ?outcome.error, "Inquiry rejected");
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(SubmitResponse {
                success: false,
                error: Some(SUBMIT_FAILED.to_string()),
                admin_email_failed: false,
            }),
        )
            .into_response();
    }

    if let Err(e) = state.ledger.record_inquiry(&inquiry).await {
        error!(error = %e, from = %inquiry.email, "Failed to record inquiry in ledger");
    }

    if outcome.admin_email_failed {
        warn!(
            error = ?outcome.admin_email_error,
            kind = %inquiry.kind,
            "Admin was not notified; inquiry kept in ledger"
        );
    } else {
        info!(kind = %inquiry.kind, "Inquiry delivered");
    }

    Json(SubmitResponse {
        success: true,
        error: None,
        admin_email_failed: outcome.admin_email_failed,
    })
    .into_response()
}

// ── Message ledger ──────────────────────────────────────────────────

async fn list_messages(State(state): State<AppState>) -> Response {
    match state.ledger.list().await {
        Ok(messages) => Json(messages).into_response(),
        Err(e) => storage_error(e),
    }
}

#[derive(Debug, Deserialize)]
struct NewMessage {
    name: String,
    email: String,
    message: String,
}

async fn add_message(State(state): State<AppState>, Json(body): Json<NewMessage>) -> Response {
    if body.message.trim().is_empty() {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "message must not be empty");
    }
    let message = AdminMessage::new(body.name, body.email, body.message);
    match state.ledger.append(message).await {
        Ok(message) => (StatusCode::CREATED, Json(message)).into_response(),
        Err(e) => storage_error(e),
    }
}

async fn remove_message(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.ledger.remove(&id).await {
        Ok(true) => Json(json!({ "status": "deleted" })).into_response(),
        Ok(false) => error_response(StatusCode::NOT_FOUND, "Message not found"),
        Err(e) => storage_error(e),
    }
}

async fn clear_messages(State(state): State<AppState>) -> Response {
    match state.ledger.clear().await {
        Ok(()) => Json(json!({ "status": "cleared" })).into_response(),
        Err(e) => storage_error(e),
    }
}

// ── Content ─────────────────────────────────────────────────────────

fn content_error(e: ContentError) -> Response {
    match &e {
        ContentError::UnknownKey(_) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        ContentError::Invalid { .. } => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
        ContentError::Database(db) => storage_error(db),
    }
}

async fn get_content(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let key: ContentKey = match key.parse() {
        Ok(key) => key,
        Err(e) => return content_error(e),
    };
    match state.content.load_json(key).await {
        Ok(value) => Json(value).into_response(),
        Err(e) => content_error(e),
    }
}

async fn put_content(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(value): Json<serde_json::Value>,
) -> Response {
    let key: ContentKey = match key.parse() {
        Ok(key) => key,
        Err(e) => return content_error(e),
    };
    match state.content.save_json(key, value).await {
        Ok(saved) => {
            info!(key = %key, "Content updated");
            Json(saved).into_response()
        }
        Err(e) => content_error(e),
    }
}

async fn reset_content(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let key: ContentKey = match key.parse() {
        Ok(key) => key,
        Err(e) => return content_error(e),
    };
    if let Err(e) = state.content.reset(key).await {
        return storage_error(e);
    }
    info!(key = %key, "Content reset to defaults");
    match state.content.load_json(key).await {
        Ok(value) => Json(value).into_response(),
        Err(e) => content_error(e),
    }
}

// ── Drafts ──────────────────────────────────────────────────────────

/// Admin-facing: generation failures keep their detail.
fn gateway_error(e: GatewayError) -> Response {
    match &e {
        GatewayError::Validation { flow, errors } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": e.to_string(), "flow": flow, "errors": errors })),
        )
            .into_response(),
        GatewayError::Generation { flow, .. } => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": e.to_string(), "flow": flow })),
        )
            .into_response(),
        GatewayError::UnknownFlow(_) => error_response(StatusCode::NOT_FOUND, e.to_string()),
    }
}

fn drafts_unavailable() -> Response {
    error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        "AI drafting is not configured",
    )
}

async fn draft_flow(
    State(state): State<AppState>,
    Path(flow): Path<String>,
    Json(input): Json<serde_json::Value>,
) -> Response {
    let Some(gateway) = state.gateway.as_ref() else {
        return drafts_unavailable();
    };
    let kind: DraftKind = match flow.parse() {
        Ok(kind) => kind,
        Err(e) => return gateway_error(e),
    };
    match gateway.run_json(kind, input).await {
        Ok(output) => Json(output).into_response(),
        Err(e) => gateway_error(e),
    }
}

async fn draft_block(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let Some(gateway) = state.gateway.as_ref() else {
        return drafts_unavailable();
    };
    let request: ContentBlockRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(e) => {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Invalid content block request: {e}"),
            );
        }
    };
    match gateway.generate_block(request).await {
        Ok(draft) => Json(draft).into_response(),
        Err(e) => gateway_error(e),
    }
}
