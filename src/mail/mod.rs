//! Outbound email: template rendering and SMTP delivery.

pub mod template;
pub mod transport;

pub use template::{
    EmailTemplate, RenderedTemplate, TemplateId, TemplateSet, TemplateVars, html_to_text,
    plain_text_body,
};
pub use transport::{
    MailTransport, OutboundEmail, SendFailure, SendResult, SmtpConfig, SmtpMailer,
};
