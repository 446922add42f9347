//! Content-block drafting and name-keyed flow dispatch.

use serde::{Deserialize, Serialize};

use crate::drafts::flows::*;
use crate::drafts::{DraftFlow, DraftGateway};
use crate::error::{GatewayError, ValidationError};

/// A request to draft one block of site copy. The `kind` tag selects the
/// flow; the remaining fields are that flow's input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentBlockRequest {
    Hero(HeroTaglineInput),
    About(AboutTextInput),
    Service(ServiceDescriptionInput),
    Project(ProjectDescriptionInput),
    Testimonial(TestimonialPolishInput),
}

/// The drafted block, tagged the same way as its request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentBlockDraft {
    Hero(HeroTaglineOutput),
    About(AboutTextOutput),
    Service(ServiceDescriptionOutput),
    Project(ProjectDescriptionOutput),
    Testimonial(TestimonialPolishOutput),
}

impl DraftGateway {
    pub async fn generate_block(
        &self,
        request: ContentBlockRequest,
    ) -> Result<ContentBlockDraft, GatewayError> {
        Ok(match request {
            ContentBlockRequest::Hero(input) => {
                ContentBlockDraft::Hero(self.run::<HeroTagline>(input).await?)
            }
            ContentBlockRequest::About(input) => {
                ContentBlockDraft::About(self.run::<AboutText>(input).await?)
            }
            ContentBlockRequest::Service(input) => {
                ContentBlockDraft::Service(self.run::<ServiceDescription>(input).await?)
            }
            ContentBlockRequest::Project(input) => {
                ContentBlockDraft::Project(self.run::<ProjectDescription>(input).await?)
            }
            ContentBlockRequest::Testimonial(input) => {
                ContentBlockDraft::Testimonial(self.run::<TestimonialPolish>(input).await?)
            }
        })
    }

    /// Run a flow chosen by name on an untyped JSON input.
    pub async fn run_json(
        &self,
        kind: DraftKind,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        match kind {
            DraftKind::ProjectIdeas => self.run_value::<ProjectIdeas>(input).await,
            DraftKind::SummarizeMessage => self.run_value::<SummarizeMessage>(input).await,
            DraftKind::SummarizeMessages => self.run_value::<SummarizeMessages>(input).await,
            DraftKind::DraftReplyEmail => self.run_value::<DraftReplyEmail>(input).await,
            DraftKind::AboutText => self.run_value::<AboutText>(input).await,
            DraftKind::ServiceDescription => self.run_value::<ServiceDescription>(input).await,
            DraftKind::ProjectDescription => self.run_value::<ProjectDescription>(input).await,
            DraftKind::HeroTagline => self.run_value::<HeroTagline>(input).await,
            DraftKind::SeoMetadata => self.run_value::<SeoMetadata>(input).await,
            DraftKind::EmailTemplateDraft => self.run_value::<EmailTemplateDraft>(input).await,
            DraftKind::TestimonialPolish => self.run_value::<TestimonialPolish>(input).await,
        }
    }

    async fn run_value<F: DraftFlow>(
        &self,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let input: F::Input =
            serde_json::from_value(input).map_err(|e| GatewayError::Validation {
                flow: F::NAME.to_string(),
                errors: vec![ValidationError::new("input", e.to_string())],
            })?;
        let output = self.run::<F>(input).await?;
        serde_json::to_value(output).map_err(|e| GatewayError::Generation {
            flow: F::NAME.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Every draft flow, by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftKind {
    ProjectIdeas,
    SummarizeMessage,
    SummarizeMessages,
    DraftReplyEmail,
    AboutText,
    ServiceDescription,
    ProjectDescription,
    HeroTagline,
    SeoMetadata,
    EmailTemplateDraft,
    TestimonialPolish,
}

impl DraftKind {
    pub const ALL: [DraftKind; 11] = [
        Self::ProjectIdeas,
        Self::SummarizeMessage,
        Self::SummarizeMessages,
        Self::DraftReplyEmail,
        Self::AboutText,
        Self::ServiceDescription,
        Self::ProjectDescription,
        Self::HeroTagline,
        Self::SeoMetadata,
        Self::EmailTemplateDraft,
        Self::TestimonialPolish,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ProjectIdeas => ProjectIdeas::NAME,
            Self::SummarizeMessage => SummarizeMessage::NAME,
            Self::SummarizeMessages => SummarizeMessages::NAME,
            Self::DraftReplyEmail => DraftReplyEmail::NAME,
            Self::AboutText => AboutText::NAME,
            Self::ServiceDescription => ServiceDescription::NAME,
            Self::ProjectDescription => ProjectDescription::NAME,
            Self::HeroTagline => HeroTagline::NAME,
            Self::SeoMetadata => SeoMetadata::NAME,
            Self::EmailTemplateDraft => EmailTemplateDraft::NAME,
            Self::TestimonialPolish => TestimonialPolish::NAME,
        }
    }
}

impl std::str::FromStr for DraftKind {
    type Err = GatewayError;

    /// Accepts `snake_case` and `kebab-case` flow names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| GatewayError::UnknownFlow(s.to_string()))
    }
}

impl std::fmt::Display for DraftKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::drafts::testing::{ScriptedLlm, gateway};

    #[test]
    fn kind_names_parse_back() {
        for kind in DraftKind::ALL {
            assert_eq!(kind.name().parse::<DraftKind>().unwrap(), kind);
        }
        assert_eq!(
            "seo-metadata".parse::<DraftKind>().unwrap(),
            DraftKind::SeoMetadata
        );
        assert!(matches!(
            "poem".parse::<DraftKind>(),
            Err(GatewayError::UnknownFlow(_))
        ));
    }

    #[test]
    fn block_request_is_tagged_by_kind() {
        let request: ContentBlockRequest = serde_json::from_value(json!({
            "kind": "service",
            "serviceName": "SEO audits",
            "keyFeatures": ["Reports"]
        }))
        .unwrap();
        assert!(matches!(
            request,
            ContentBlockRequest::Service(ServiceDescriptionInput { ref service_name, .. })
                if service_name == "SEO audits"
        ));

        assert!(serde_json::from_value::<ContentBlockRequest>(json!({"kind": "footer"})).is_err());
    }

    #[tokio::test]
    async fn generate_block_dispatches_to_typed_flow() {
        let llm = ScriptedLlm::replying(r#"{"heading": "Hi, I'm Ann", "body": "I build sites."}"#);
        let draft = gateway(llm.clone())
            .generate_block(ContentBlockRequest::About(AboutTextInput {
                name: "Ann".into(),
                profession: "web designer".into(),
                highlights: vec![],
                tone: None,
            }))
            .await
            .unwrap();

        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["kind"], "about");
        assert_eq!(json["heading"], "Hi, I'm Ann");
        assert!(
            llm.requests.lock().unwrap()[0]
                .messages[1]
                .content
                .contains("About section for Ann")
        );
    }

    #[tokio::test]
    async fn run_json_rejects_wrong_shape_before_calling() {
        let llm = ScriptedLlm::replying("{}");
        let err = gateway(llm.clone())
            .run_json(DraftKind::HeroTagline, json!({"name": 5}))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation { ref flow, .. } if flow == "hero_tagline"));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn run_json_returns_output_json() {
        let llm = ScriptedLlm::replying(r#"{"summary": "Wants a quote."}"#);
        let value = gateway(llm)
            .run_json(
                DraftKind::SummarizeMessage,
                json!({"message": "How much for a site?", "sender": "Ann"}),
            )
            .await
            .unwrap();
        assert_eq!(value, json!({"summary": "Wants a quote."}));
    }
}
