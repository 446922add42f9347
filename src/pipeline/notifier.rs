//! Inquiry notifier — turns one inquiry into two emails and sends both.
//!
//! The visitor always gets a confirmation attempt first, then the site owner
//! gets a notification. Only an invalid inquiry is a hard failure. A missing
//! or failed admin notification is reported as `admin_email_failed` alongside
//! `success: true`, so the caller can thank the visitor and still record the
//! delivery gap.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::mail::template::{TemplateId, TemplateSet, TemplateVars, echo_text, escape_html};
use crate::mail::{MailTransport, OutboundEmail, SendResult};

use super::inquiry::{Inquiry, InquiryKind};

/// Notifier settings.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Shown in email footers.
    pub site_name: String,
    /// Recipient of admin notifications. `None` disables them.
    pub admin_email: Option<String>,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            site_name: "Portfolio".to_string(),
            admin_email: None,
        }
    }
}

/// Outcome of [`InquiryNotifier::notify`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyOutcome {
    pub success: bool,
    /// Why the inquiry was rejected outright.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub admin_email_failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_email_error: Option<String>,
    /// The original inquiry, attached when the admin never got it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inquiry: Option<Inquiry>,
    #[serde(skip)]
    pub user_send: Option<SendResult>,
    #[serde(skip)]
    pub admin_send: Option<SendResult>,
}

impl NotifyOutcome {
    fn rejected(error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
            admin_email_failed: false,
            admin_email_error: None,
            inquiry: None,
            user_send: None,
            admin_send: None,
        }
    }

    fn delivered(user_send: SendResult, admin_send: SendResult) -> Self {
        Self {
            success: true,
            error: None,
            admin_email_failed: false,
            admin_email_error: None,
            inquiry: None,
            user_send: Some(user_send),
            admin_send: Some(admin_send),
        }
    }

    fn admin_failed(
        inquiry: &Inquiry,
        error: String,
        user_send: SendResult,
        admin_send: Option<SendResult>,
    ) -> Self {
        Self {
            success: true,
            error: None,
            admin_email_failed: true,
            admin_email_error: Some(error),
            inquiry: Some(inquiry.clone()),
            user_send: Some(user_send),
            admin_send,
        }
    }
}

/// Builds and sends the confirmation and notification emails for an inquiry.
pub struct InquiryNotifier {
    mailer: Arc<dyn MailTransport>,
    templates: TemplateSet,
    config: NotifierConfig,
}

impl InquiryNotifier {
    pub fn new(mailer: Arc<dyn MailTransport>, config: NotifierConfig) -> Self {
        Self {
            mailer,
            templates: TemplateSet::builtin(),
            config,
        }
    }

    pub fn with_templates(mut self, templates: TemplateSet) -> Self {
        self.templates = templates;
        self
    }

    pub fn config(&self) -> &NotifierConfig {
        &self.config
    }

    /// Notify using the notifier's own templates.
    pub async fn notify(&self, inquiry: &Inquiry) -> NotifyOutcome {
        self.notify_with(&self.templates, inquiry).await
    }

    /// Notify using a caller-supplied template set (e.g. freshly loaded admin edits).
    pub async fn notify_with(&self, templates: &TemplateSet, inquiry: &Inquiry) -> NotifyOutcome {
        if let Err(errors) = inquiry.validate() {
            let reason = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            warn!(kind = %inquiry.kind, reason = %reason, "Rejected invalid inquiry");
            return NotifyOutcome::rejected(reason);
        }

        info!(kind = %inquiry.kind, from = %inquiry.email, "Processing inquiry");

        let user_email = self.user_confirmation(templates, inquiry);
        let user_send = self.mailer.deliver(user_email).await;
        if !user_send.success {
            // The admin may still be notified; the visitor is not shown this.
            warn!(
                to = %inquiry.email,
                error = user_send.error.as_deref().unwrap_or("unknown"),
                "Confirmation email to visitor failed"
            );
        }

        let Some(admin) = self.admin_recipient() else {
            let error = "Admin email address is not configured (ADMIN_EMAIL); \
                         inquiry notification was not sent"
                .to_string();
            warn!(from = %inquiry.email, "{error}");
            return NotifyOutcome::admin_failed(inquiry, error, user_send, None);
        };

        let admin_email = self.admin_notification(templates, inquiry, admin);
        let admin_send = self.mailer.deliver(admin_email).await;
        if admin_send.success {
            info!(from = %inquiry.email, "Inquiry notifications sent");
            return NotifyOutcome::delivered(user_send, admin_send);
        }

        let error = admin_send
            .error
            .clone()
            .unwrap_or_else(|| "unknown error".to_string());
        error!(
            from = %inquiry.email,
            name = %inquiry.name,
            error = %error,
            "Admin notification failed; inquiry must be followed up manually"
        );
        NotifyOutcome::admin_failed(inquiry, error, user_send, Some(admin_send))
    }

    fn admin_recipient(&self) -> Option<&str> {
        self.config
            .admin_email
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }

    /// The confirmation email sent back to the visitor.
    pub fn user_confirmation(&self, templates: &TemplateSet, inquiry: &Inquiry) -> OutboundEmail {
        let id = match inquiry.kind {
            InquiryKind::GeneralContact => TemplateId::UserContactConfirmation,
            InquiryKind::ProjectServiceInquiry => TemplateId::UserInquiryConfirmation,
        };
        let rendered = templates.render_parts(id, &self.subject_vars(inquiry), &self.vars(inquiry));
        OutboundEmail::new(inquiry.email.trim(), rendered.subject, rendered.html, None)
    }

    /// The notification email sent to the site owner.
    pub fn admin_notification(
        &self,
        templates: &TemplateSet,
        inquiry: &Inquiry,
        admin: &str,
    ) -> OutboundEmail {
        let id = match inquiry.kind {
            InquiryKind::GeneralContact => TemplateId::AdminContactNotification,
            InquiryKind::ProjectServiceInquiry => TemplateId::AdminInquiryNotification,
        };
        let rendered = templates.render_parts(id, &self.subject_vars(inquiry), &self.vars(inquiry));
        OutboundEmail::new(admin, rendered.subject, rendered.html, None)
    }

    fn subject_vars(&self, inquiry: &Inquiry) -> TemplateVars {
        let single_line = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut vars = TemplateVars::new();
        vars.insert("site_name", single_line(&self.config.site_name));
        vars.insert("name", single_line(&inquiry.name));
        vars.insert("email", inquiry.email.trim().to_string());
        vars.insert("kind", inquiry.kind.to_string());
        vars.insert(
            "project_title",
            single_line(inquiry.project_title().unwrap_or_default()),
        );
        vars
    }

    fn vars(&self, inquiry: &Inquiry) -> TemplateVars {
        let mut vars = TemplateVars::new();
        vars.insert("site_name", escape_html(&self.config.site_name));
        vars.insert("name", escape_html(inquiry.name.trim()));
        vars.insert("email", escape_html(inquiry.email.trim()));
        vars.insert("kind", inquiry.kind.to_string());
        vars.insert("message", echo_text(&inquiry.message));
        vars.insert("idea", echo_text(inquiry.idea_or_message()));
        vars.insert(
            "project_title_block",
            inquiry
                .project_title()
                .map(|title| format!("<p><strong>Project:</strong> {}</p>", escape_html(title)))
                .unwrap_or_default(),
        );
        vars.insert(
            "ai_ideas_block",
            inquiry
                .ai_ideas()
                .map(|ideas| {
                    let items: String = ideas
                        .iter()
                        .map(|idea| format!("<li>{}</li>", echo_text(idea)))
                        .collect();
                    format!("<hr><p><strong>AI Suggested Ideas:</strong></p><ul>{items}</ul>")
                })
                .unwrap_or_default(),
        );
        vars
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::mail::SendFailure;

    /// Records every delivery; fails sends to the listed recipients.
    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutboundEmail>>,
        fail_for: Vec<String>,
    }

    impl RecordingMailer {
        fn failing_for(recipient: &str) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_for: vec![recipient.to_string()],
            }
        }

        fn sent(&self) -> Vec<OutboundEmail> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MailTransport for RecordingMailer {
        async fn deliver(&self, email: OutboundEmail) -> SendResult {
            let fail = self.fail_for.contains(&email.recipient);
            self.sent.lock().unwrap().push(email);
            if fail {
                SendResult::failed(SendFailure::Provider, "550 mailbox unavailable")
            } else {
                SendResult::sent("<test@folio>")
            }
        }
    }

    fn notifier(mailer: Arc<RecordingMailer>, admin: Option<&str>) -> InquiryNotifier {
        InquiryNotifier::new(
            mailer,
            NotifierConfig {
                site_name: "Folio".into(),
                admin_email: admin.map(str::to_string),
            },
        )
    }

    fn jane() -> Inquiry {
        Inquiry::contact("Jane", "jane@x.com", "Hi")
    }

    // ── Email building ──────────────────────────────────────────────

    #[test]
    fn contact_confirmation_echoes_message_with_breaks() {
        let n = notifier(Arc::default(), Some("admin@folio.dev"));
        let inquiry = Inquiry::contact("Jane", "jane@x.com", "line one\nline two");
        let email = n.user_confirmation(&TemplateSet::builtin(), &inquiry);

        assert_eq!(email.recipient, "jane@x.com");
        assert_eq!(email.subject, "Thanks for reaching out, Jane!");
        assert!(email.html_body.contains("line one<br>line two"));
        assert!(!email.html_body.contains("Your idea"));
        assert!(!email.html_body.contains("Project"));
        assert!(email.plain_text_body.contains("line one\nline two"));
    }

    #[test]
    fn project_confirmation_uses_inquiry_template() {
        let n = notifier(Arc::default(), Some("admin@folio.dev"));
        let inquiry = Inquiry::project("Jane", "jane@x.com", "msg")
            .with_project_title("Shop")
            .with_client_idea("An online\nstore");
        let email = n.user_confirmation(&TemplateSet::builtin(), &inquiry);

        assert_eq!(email.subject, "We received your project inquiry, Jane");
        assert!(email.html_body.contains("<strong>Project:</strong> Shop"));
        assert!(email.html_body.contains("An online<br>store"));
    }

    #[test]
    fn admin_notification_falls_back_to_message_and_omits_empty_blocks() {
        let n = notifier(Arc::default(), Some("admin@folio.dev"));
        let inquiry = Inquiry::project("Jane", "jane@x.com", "Please build\nmy app");
        let email = n.admin_notification(&TemplateSet::builtin(), &inquiry, "admin@folio.dev");

        assert_eq!(email.recipient, "admin@folio.dev");
        assert!(email.html_body.contains("Please build<br>my app"));
        assert!(!email.html_body.contains("AI Suggested Ideas"));
        assert!(!email.html_body.contains("<strong>Project:</strong>"));
        assert!(!email.html_body.contains("{{"));
    }

    #[test]
    fn admin_notification_includes_ai_ideas_when_present() {
        let n = notifier(Arc::default(), Some("admin@folio.dev"));
        let inquiry = Inquiry::project("Jane", "jane@x.com", "msg")
            .with_client_idea("A bakery site")
            .with_ai_ideas(vec!["Online ordering".into(), "Seasonal menu".into()]);
        let email = n.admin_notification(&TemplateSet::builtin(), &inquiry, "admin@folio.dev");

        assert!(email.html_body.contains("A bakery site"));
        assert!(email.html_body.contains("AI Suggested Ideas"));
        assert!(email.html_body.contains("<li>Online ordering</li>"));
        assert!(email.html_body.contains("<li>Seasonal menu</li>"));
    }

    #[test]
    fn user_text_is_escaped() {
        let n = notifier(Arc::default(), Some("admin@folio.dev"));
        let inquiry = Inquiry::contact("<b>Eve</b>", "eve@x.com", "<script>x</script>");
        let email = n.admin_notification(&TemplateSet::builtin(), &inquiry, "admin@folio.dev");
        assert!(!email.html_body.contains("<script>"));
        assert!(email.html_body.contains("&lt;script&gt;"));
        assert_eq!(email.subject, "New contact message from <b>Eve</b>");
    }

    #[test]
    fn plain_text_parts_carry_unescaped_text() {
        let n = notifier(Arc::default(), Some("admin@folio.dev"));
        let inquiry = Inquiry::contact("Jane", "jane@x.com", "I'm keen & \"ready\"");

        let admin = n.admin_notification(&TemplateSet::builtin(), &inquiry, "admin@folio.dev");
        assert!(admin.html_body.contains("I&#x27;m keen &amp; &quot;ready&quot;"));
        assert!(admin.plain_text_body.contains("From: Jane <jane@x.com>"));
        assert!(admin.plain_text_body.contains("I'm keen & \"ready\""));

        let user = n.user_confirmation(&TemplateSet::builtin(), &inquiry);
        assert!(user.plain_text_body.contains("I'm keen & \"ready\""));
        assert!(!user.plain_text_body.contains("&amp;"));
    }

    // ── notify ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn both_sends_succeed() {
        let mailer = Arc::new(RecordingMailer::default());
        let n = notifier(Arc::clone(&mailer), Some("admin@folio.dev"));

        let outcome = n.notify(&jane()).await;
        assert!(outcome.success);
        assert!(!outcome.admin_email_failed);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].recipient, "jane@x.com");
        assert_eq!(sent[1].recipient, "admin@folio.dev");

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json, serde_json::json!({"success": true}));
    }

    #[tokio::test]
    async fn missing_admin_is_a_soft_failure() {
        let mailer = Arc::new(RecordingMailer::default());
        let n = notifier(Arc::clone(&mailer), None);

        let outcome = n.notify(&jane()).await;
        assert!(outcome.success);
        assert!(outcome.admin_email_failed);
        assert!(outcome.admin_email_error.unwrap().contains("ADMIN_EMAIL"));
        assert_eq!(outcome.inquiry, Some(jane()));
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn blank_admin_counts_as_missing() {
        let mailer = Arc::new(RecordingMailer::default());
        let n = notifier(Arc::clone(&mailer), Some("  "));
        let outcome = n.notify(&jane()).await;
        assert!(outcome.success);
        assert!(outcome.admin_email_failed);
    }

    #[tokio::test]
    async fn admin_send_failure_keeps_success_and_attaches_inquiry() {
        let mailer = Arc::new(RecordingMailer::failing_for("admin@folio.dev"));
        let n = notifier(Arc::clone(&mailer), Some("admin@folio.dev"));

        let outcome = n.notify(&jane()).await;
        assert!(outcome.success);
        assert!(outcome.admin_email_failed);
        assert_eq!(
            outcome.admin_email_error.as_deref(),
            Some("550 mailbox unavailable")
        );
        assert_eq!(outcome.inquiry, Some(jane()));

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["adminEmailFailed"], true);
        assert_eq!(json["inquiry"]["email"], "jane@x.com");
    }

    #[tokio::test]
    async fn user_send_failure_does_not_abort() {
        let mailer = Arc::new(RecordingMailer::failing_for("jane@x.com"));
        let n = notifier(Arc::clone(&mailer), Some("admin@folio.dev"));

        let outcome = n.notify(&jane()).await;
        assert!(outcome.success);
        assert!(!outcome.admin_email_failed);
        assert!(!outcome.user_send.unwrap().success);
        assert_eq!(mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn invalid_inquiry_sends_nothing() {
        let mailer = Arc::new(RecordingMailer::default());
        let n = notifier(Arc::clone(&mailer), Some("admin@folio.dev"));

        let outcome = n.notify(&Inquiry::contact("", "jane@x.com", "Hi")).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("name"));
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn notify_with_uses_supplied_templates() {
        let mailer = Arc::new(RecordingMailer::default());
        let n = notifier(Arc::clone(&mailer), Some("admin@folio.dev"));
        let templates = TemplateSet::builtin().with_overrides([(
            TemplateId::UserContactConfirmation,
            crate::mail::EmailTemplate::new("Got it, {{name}}", "<p>{{message}}</p>"),
        )]);

        n.notify_with(&templates, &jane()).await;
        let sent = mailer.sent();
        assert_eq!(sent[0].subject, "Got it, Jane");
        assert_eq!(sent[0].html_body, "<p>Hi</p>");
    }
}
