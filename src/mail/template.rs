//! Email templates — placeholder substitution and HTML → plain-text conversion.
//!
//! Templates use `{{name}}` placeholders. Substitution is a single pass, so
//! substituted values are never re-scanned, and placeholders without a value
//! are left in the output untouched.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").unwrap());
static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>").unwrap()
});
static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static PARAGRAPH_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</p\s*>").unwrap());
static RULE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<hr\b[^>]*>").unwrap());
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").unwrap());

/// Separator line emitted in place of `<hr>`.
pub const TEXT_SEPARATOR: &str = "----------------------------------------";

/// Placeholder values keyed by placeholder name.
pub type TemplateVars = HashMap<&'static str, String>;

/// Substitute every `{{name}}` whose name appears in `vars`.
pub fn fill(template: &str, vars: &TemplateVars) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Best-effort plain-text rendition of an HTML body.
pub fn html_to_text(html: &str) -> String {
    let text = SCRIPT_OR_STYLE.replace_all(html, "");
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = PARAGRAPH_END.replace_all(&text, "\n\n");
    let text = RULE.replace_all(&text, format!("\n{TEXT_SEPARATOR}\n").as_str());
    let text = ANY_TAG.replace_all(&text, "");
    let text = text.replace("\r\n", "\n");
    let text = BLANK_RUN.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Plain-text part of an email: [`html_to_text`] with entities decoded.
pub fn plain_text_body(html: &str) -> String {
    html_escape::decode_html_entities(&html_to_text(html)).into_owned()
}

/// Escape text for an HTML body or a quoted attribute value.
pub fn escape_html(text: &str) -> String {
    html_escape::encode_quoted_attribute(text).into_owned()
}

/// Convert newlines to `<br>`.
pub fn nl2br(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "<br>")
}

/// Escape user-supplied text and keep its line structure.
pub fn echo_text(text: &str) -> String {
    nl2br(&escape_html(text))
}

// ── Named templates ─────────────────────────────────────────────────

/// Identifier of a named email template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateId {
    /// Confirmation sent to a visitor who used the contact form.
    UserContactConfirmation,
    /// Confirmation sent to a visitor who submitted a project inquiry.
    UserInquiryConfirmation,
    /// Notification sent to the site owner for a contact message.
    AdminContactNotification,
    /// Notification sent to the site owner for a project inquiry.
    AdminInquiryNotification,
}

impl TemplateId {
    pub const ALL: [TemplateId; 4] = [
        Self::UserContactConfirmation,
        Self::UserInquiryConfirmation,
        Self::AdminContactNotification,
        Self::AdminInquiryNotification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserContactConfirmation => "user_contact_confirmation",
            Self::UserInquiryConfirmation => "user_inquiry_confirmation",
            Self::AdminContactNotification => "admin_contact_notification",
            Self::AdminInquiryNotification => "admin_inquiry_notification",
        }
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TemplateId {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("Unknown email template: {s}"))
    }
}

/// Subject and HTML body of a template, both with placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub subject: String,
    pub html: String,
}

impl EmailTemplate {
    pub fn new(subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            html: html.into(),
        }
    }
}

/// A template after placeholder substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplate {
    pub subject: String,
    pub html: String,
}

/// The set of templates the notifier renders from.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    templates: HashMap<TemplateId, EmailTemplate>,
}

impl TemplateSet {
    /// Compiled-in templates.
    pub fn builtin() -> Self {
        let templates = TemplateId::ALL
            .into_iter()
            .map(|id| (id, builtin_template(id)))
            .collect();
        Self { templates }
    }

    /// Replace built-in templates with admin-edited ones.
    ///
    /// Overrides with an empty subject or body are ignored.
    pub fn with_overrides<I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (TemplateId, EmailTemplate)>,
    {
        for (id, template) in overrides {
            if template.subject.trim().is_empty() || template.html.trim().is_empty() {
                tracing::warn!(template = %id, "Ignoring empty email template override");
                continue;
            }
            self.templates.insert(id, template);
        }
        self
    }

    pub fn get(&self, id: TemplateId) -> EmailTemplate {
        self.templates
            .get(&id)
            .cloned()
            .unwrap_or_else(|| builtin_template(id))
    }

    /// Render a named template with the given placeholder values.
    pub fn render(&self, id: TemplateId, vars: &TemplateVars) -> RenderedTemplate {
        self.render_parts(id, vars, vars)
    }

    /// Render with separate values for the subject line (plain text) and
    /// the HTML body (escaped).
    pub fn render_parts(
        &self,
        id: TemplateId,
        subject_vars: &TemplateVars,
        html_vars: &TemplateVars,
    ) -> RenderedTemplate {
        let template = self.get(id);
        RenderedTemplate {
            subject: fill(&template.subject, subject_vars),
            html: fill(&template.html, html_vars),
        }
    }
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Built-in template for an id.
pub fn builtin_template(id: TemplateId) -> EmailTemplate {
    match id {
        TemplateId::UserContactConfirmation => EmailTemplate::new(
            "Thanks for reaching out, {{name}}!",
            wrap_layout(
                "<p>Hi {{name}},</p>\
                 <p>Thanks for getting in touch. Your message has been received and \
                 I'll get back to you as soon as I can.</p>\
                 <hr>\
                 <p><strong>Your message:</strong></p>\
                 <p>{{message}}</p>",
            ),
        ),
        TemplateId::UserInquiryConfirmation => EmailTemplate::new(
            "We received your project inquiry, {{name}}",
            wrap_layout(
                "<p>Hi {{name}},</p>\
                 <p>Thanks for your interest in working together. I've received your \
                 project inquiry and will review it shortly.</p>\
                 <hr>\
                 {{project_title_block}}\
                 <p><strong>Your idea:</strong></p>\
                 <p>{{idea}}</p>",
            ),
        ),
        TemplateId::AdminContactNotification => EmailTemplate::new(
            "New contact message from {{name}}",
            wrap_layout(
                "<p><strong>From:</strong> {{name}} \
                 &lt;<a href=\"mailto:{{email}}\">{{email}}</a>&gt;</p>\
                 <p><strong>Type:</strong> {{kind}}</p>\
                 <hr>\
                 <p><strong>Message:</strong></p>\
                 <p>{{message}}</p>",
            ),
        ),
        TemplateId::AdminInquiryNotification => EmailTemplate::new(
            "New project inquiry from {{name}}",
            wrap_layout(
                "<p><strong>From:</strong> {{name}} \
                 &lt;<a href=\"mailto:{{email}}\">{{email}}</a>&gt;</p>\
                 <p><strong>Type:</strong> {{kind}}</p>\
                 {{project_title_block}}\
                 <hr>\
                 <p><strong>Project idea:</strong></p>\
                 <p>{{idea}}</p>\
                 {{ai_ideas_block}}",
            ),
        ),
    }
}

fn wrap_layout(content: &str) -> String {
    format!(
        "<!DOCTYPE html>\
         <html><head><meta charset=\"utf-8\">\
         <style>body{{font-family:Arial,sans-serif;line-height:1.6;color:#333;}}</style>\
         </head><body>\
         <div class=\"content\">{content}</div>\
         <p style=\"font-size:12px;color:#888;\">{{{{site_name}}}}</p>\
         </body></html>"
    )
}
