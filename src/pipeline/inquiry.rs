//! One submission of the contact or project-inquiry form.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Which form produced the inquiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InquiryKind {
    #[serde(rename = "General Contact")]
    GeneralContact,
    #[serde(rename = "Project Service Inquiry")]
    ProjectServiceInquiry,
}

impl std::fmt::Display for InquiryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GeneralContact => write!(f, "General Contact"),
            Self::ProjectServiceInquiry => write!(f, "Project Service Inquiry"),
        }
    }
}

/// A visitor's submission. Immutable once built; consumed once by the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub message: String,
    pub kind: InquiryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_project_idea: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_generated_ideas: Option<Vec<String>>,
}

impl Inquiry {
    /// A general contact-form message.
    pub fn contact(
        name: impl Into<String>,
        email: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            message: message.into(),
            kind: InquiryKind::GeneralContact,
            project_title: None,
            client_project_idea: None,
            ai_generated_ideas: None,
        }
    }

    /// A project/service inquiry.
    pub fn project(
        name: impl Into<String>,
        email: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: InquiryKind::ProjectServiceInquiry,
            ..Self::contact(name, email, message)
        }
    }

    pub fn with_project_title(mut self, title: impl Into<String>) -> Self {
        self.project_title = Some(title.into());
        self
    }

    pub fn with_client_idea(mut self, idea: impl Into<String>) -> Self {
        self.client_project_idea = Some(idea.into());
        self
    }

    pub fn with_ai_ideas(mut self, ideas: Vec<String>) -> Self {
        self.ai_generated_ideas = Some(ideas);
        self
    }

    /// Project title, if present and non-blank.
    pub fn project_title(&self) -> Option<&str> {
        non_blank(self.project_title.as_deref())
    }

    /// The client's idea, if present and non-blank.
    pub fn client_idea(&self) -> Option<&str> {
        non_blank(self.client_project_idea.as_deref())
    }

    /// Non-blank AI suggestions, or `None` when there are none.
    pub fn ai_ideas(&self) -> Option<Vec<&str>> {
        let ideas: Vec<&str> = self
            .ai_generated_ideas
            .iter()
            .flatten()
            .map(|idea| idea.trim())
            .filter(|idea| !idea.is_empty())
            .collect();
        (!ideas.is_empty()).then_some(ideas)
    }

    /// The text to echo back: the client's idea, falling back to the message.
    pub fn idea_or_message(&self) -> &str {
        self.client_idea().unwrap_or(&self.message)
    }

    /// Check required fields. Returns every failure, not just the first.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(ValidationError::new("name", "must not be empty"));
        }
        if self.email.trim().parse::<lettre::Address>().is_err() {
            errors.push(ValidationError::new("email", "must be a valid email address"));
        }
        let has_body = match self.kind {
            InquiryKind::GeneralContact => !self.message.trim().is_empty(),
            InquiryKind::ProjectServiceInquiry => {
                !self.message.trim().is_empty() || self.client_idea().is_some()
            }
        };
        if !has_body {
            errors.push(ValidationError::new("message", "must not be empty"));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_uses_display_names_on_the_wire() {
        let json = serde_json::to_value(Inquiry::contact("Jane", "jane@x.com", "Hi")).unwrap();
        assert_eq!(json["kind"], "General Contact");
        assert!(json.get("projectTitle").is_none());

        let parsed: Inquiry = serde_json::from_value(serde_json::json!({
            "name": "Jane",
            "email": "jane@x.com",
            "kind": "Project Service Inquiry",
            "clientProjectIdea": "A shop",
            "aiGeneratedIdeas": ["Loyalty points"]
        }))
        .unwrap();
        assert_eq!(parsed.kind, InquiryKind::ProjectServiceInquiry);
        assert_eq!(parsed.message, "");
        assert_eq!(parsed.client_idea(), Some("A shop"));
        assert_eq!(parsed.ai_ideas(), Some(vec!["Loyalty points"]));
    }

    #[test]
    fn idea_falls_back_to_message() {
        let inquiry = Inquiry::project("Jane", "jane@x.com", "Build me a site");
        assert_eq!(inquiry.idea_or_message(), "Build me a site");

        let inquiry = inquiry.with_client_idea("   ");
        assert_eq!(inquiry.idea_or_message(), "Build me a site");

        let inquiry = inquiry.with_client_idea("A portfolio");
        assert_eq!(inquiry.idea_or_message(), "A portfolio");
    }

    #[test]
    fn blank_ai_ideas_count_as_absent() {
        let inquiry = Inquiry::project("Jane", "jane@x.com", "x").with_ai_ideas(vec![" ".into()]);
        assert!(inquiry.ai_ideas().is_none());
    }

    #[test]
    fn validate_accepts_complete_inquiry() {
        assert!(Inquiry::contact("Jane", "jane@x.com", "Hi").validate().is_ok());
        assert!(
            Inquiry::project("Jane", "jane@x.com", "")
                .with_client_idea("An app")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn validate_reports_every_problem() {
        let errors = Inquiry::contact(" ", "not-an-email", "").validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "email", "message"]);
    }
}
