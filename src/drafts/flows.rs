//! The draft flows. Each is a unit struct implementing [`DraftFlow`].

use serde::{Deserialize, Serialize};

use crate::drafts::{Checks, DraftFlow, Validate};
use crate::error::ValidationError;
use crate::mail::{TemplateId, TemplateVars};

/// Render a list as `- item` lines, or a placeholder when empty.
fn bullets(items: &[String]) -> String {
    let lines: Vec<String> = items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| format!("- {item}"))
        .collect();
    if lines.is_empty() {
        "(none given)".to_string()
    } else {
        lines.join("\n")
    }
}

fn or_unspecified(value: &Option<String>) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("not specified")
        .to_string()
}

// ── Project ideas ───────────────────────────────────────────────────

/// Suggests feature ideas for a prospective client's project; the inquiry
/// form attaches the chosen ones as `aiGeneratedIdeas`.
pub struct ProjectIdeas;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectIdeasInput {
    pub project_description: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default = "default_idea_count")]
    pub count: u32,
}

fn default_idea_count() -> u32 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectIdeasOutput {
    pub ideas: Vec<String>,
}

impl Validate for ProjectIdeasInput {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::new()
            .required("projectDescription", &self.project_description)
            .max_chars("projectDescription", &self.project_description, 2000)
            .range("count", self.count, 1, 10)
            .finish()
    }
}

impl Validate for ProjectIdeasOutput {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::new().non_empty_list("ideas", &self.ideas).finish()
    }
}

impl DraftFlow for ProjectIdeas {
    const NAME: &'static str = "project_ideas";
    const PROMPT: &'static str = "A prospective client described the website project below. \
Suggest {{count}} concrete, distinct feature ideas that would make it more useful for their \
visitors. Each idea is one sentence.\n\nIndustry: {{industry}}\n\n\
Project description:\n{{description}}";
    const OUTPUT_SHAPE: &'static str = r#"{"ideas": ["string", "..."]}"#;
    const TEMPERATURE: f32 = 0.9;

    type Input = ProjectIdeasInput;
    type Output = ProjectIdeasOutput;

    fn prompt_vars(input: &Self::Input) -> TemplateVars {
        TemplateVars::from([
            ("count", input.count.to_string()),
            ("industry", or_unspecified(&input.industry)),
            ("description", input.project_description.trim().to_string()),
        ])
    }
}

// ── Message summaries ───────────────────────────────────────────────

pub const NOTHING_TO_SUMMARIZE: &str = "Nothing to summarize.";
pub const NO_MESSAGES_TO_SUMMARIZE: &str = "No messages to summarize.";

/// One-paragraph summary of a single inbox message.
pub struct SummarizeMessage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeMessageInput {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub sender: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryOutput {
    pub summary: String,
}

impl Validate for SummarizeMessageInput {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::new().max_chars("message", &self.message, 20_000).finish()
    }
}

impl Validate for SummaryOutput {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::new().required("summary", &self.summary).finish()
    }
}

impl DraftFlow for SummarizeMessage {
    const NAME: &'static str = "summarize_message";
    const PROMPT: &'static str = "Summarize this message from {{sender}} in two or three \
sentences. Say what they want and anything time-sensitive.\n\nMessage:\n{{message}}";
    const OUTPUT_SHAPE: &'static str = r#"{"summary": "string"}"#;
    const TEMPERATURE: f32 = 0.3;

    type Input = SummarizeMessageInput;
    type Output = SummaryOutput;

    fn prompt_vars(input: &Self::Input) -> TemplateVars {
        TemplateVars::from([
            ("sender", or_unspecified(&input.sender)),
            ("message", input.message.trim().to_string()),
        ])
    }

    fn short_circuit(input: &Self::Input) -> Option<Self::Output> {
        input.message.trim().is_empty().then(|| SummaryOutput {
            summary: NOTHING_TO_SUMMARIZE.to_string(),
        })
    }
}

/// Digest of the whole inbox.
pub struct SummarizeMessages;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDigestEntry {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeMessagesInput {
    #[serde(default)]
    pub messages: Vec<MessageDigestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxSummary {
    pub summary: String,
    #[serde(default)]
    pub highlights: Vec<String>,
}

impl SummarizeMessagesInput {
    fn non_blank(&self) -> impl Iterator<Item = &MessageDigestEntry> {
        self.messages.iter().filter(|m| !m.message.trim().is_empty())
    }
}

impl Validate for SummarizeMessagesInput {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        if self.messages.len() > 200 {
            return Err(vec![ValidationError::new(
                "messages",
                "must contain at most 200 entries",
            )]);
        }
        Ok(())
    }
}

impl Validate for InboxSummary {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::new().required("summary", &self.summary).finish()
    }
}

impl DraftFlow for SummarizeMessages {
    const NAME: &'static str = "summarize_messages";
    const PROMPT: &'static str = "Here are {{count}} messages from the site's contact form. \
Write a short overview of what people are asking for, then list the few messages that most \
need a reply.\n\n{{messages}}";
    const OUTPUT_SHAPE: &'static str = r#"{"summary": "string", "highlights": ["string", "..."]}"#;
    const TEMPERATURE: f32 = 0.3;

    type Input = SummarizeMessagesInput;
    type Output = InboxSummary;

    fn prompt_vars(input: &Self::Input) -> TemplateVars {
        let entries: Vec<String> = input
            .non_blank()
            .enumerate()
            .map(|(i, m)| {
                let from = match m.email.as_deref().filter(|e| !e.trim().is_empty()) {
                    Some(email) => format!("{} <{}>", m.name, email),
                    None => m.name.clone(),
                };
                format!("Message {} from {}:\n{}", i + 1, from, m.message.trim())
            })
            .collect();
        TemplateVars::from([
            ("count", entries.len().to_string()),
            ("messages", entries.join("\n\n")),
        ])
    }

    fn short_circuit(input: &Self::Input) -> Option<Self::Output> {
        (input.non_blank().next().is_none()).then(|| InboxSummary {
            summary: NO_MESSAGES_TO_SUMMARIZE.to_string(),
            highlights: Vec::new(),
        })
    }
}

// ── Reply email ─────────────────────────────────────────────────────

pub struct DraftReplyEmail;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftReplyEmailInput {
    pub recipient_name: String,
    pub original_message: String,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
}

impl Validate for DraftReplyEmailInput {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::new()
            .required("recipientName", &self.recipient_name)
            .required("originalMessage", &self.original_message)
            .max_chars("originalMessage", &self.original_message, 20_000)
            .finish()
    }
}

impl Validate for EmailDraft {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::new()
            .required("subject", &self.subject)
            .max_chars("subject", &self.subject, 200)
            .required("body", &self.body)
            .finish()
    }
}

impl DraftFlow for DraftReplyEmail {
    const NAME: &'static str = "draft_reply_email";
    const PROMPT: &'static str = "Draft a reply email to {{recipient}}. Tone: {{tone}}.\n\
Points to cover:\n{{points}}\n\nTheir message:\n{{message}}";
    const OUTPUT_SHAPE: &'static str = r#"{"subject": "string", "body": "plain text email body"}"#;

    type Input = DraftReplyEmailInput;
    type Output = EmailDraft;

    fn prompt_vars(input: &Self::Input) -> TemplateVars {
        TemplateVars::from([
            ("recipient", input.recipient_name.trim().to_string()),
            ("tone", or_unspecified(&input.tone)),
            ("points", bullets(&input.key_points)),
            ("message", input.original_message.trim().to_string()),
        ])
    }
}

// ── Site copy ───────────────────────────────────────────────────────

pub struct AboutText;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutTextInput {
    pub name: String,
    pub profession: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub tone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AboutTextOutput {
    pub heading: String,
    pub body: String,
}

impl Validate for AboutTextInput {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::new()
            .required("name", &self.name)
            .required("profession", &self.profession)
            .finish()
    }
}

impl Validate for AboutTextOutput {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::new()
            .required("heading", &self.heading)
            .required("body", &self.body)
            .finish()
    }
}

impl DraftFlow for AboutText {
    const NAME: &'static str = "about_text";
    const PROMPT: &'static str = "Write the About section for {{name}}, a {{profession}}. \
Tone: {{tone}}. Two short paragraphs in the first person.\n\nThings to mention:\n{{highlights}}";
    const OUTPUT_SHAPE: &'static str = r#"{"heading": "string", "body": "string"}"#;

    type Input = AboutTextInput;
    type Output = AboutTextOutput;

    fn prompt_vars(input: &Self::Input) -> TemplateVars {
        TemplateVars::from([
            ("name", input.name.trim().to_string()),
            ("profession", input.profession.trim().to_string()),
            ("tone", or_unspecified(&input.tone)),
            ("highlights", bullets(&input.highlights)),
        ])
    }
}

pub struct ServiceDescription;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptionInput {
    pub service_name: String,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub key_features: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDescriptionOutput {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
}

impl Validate for ServiceDescriptionInput {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::new().required("serviceName", &self.service_name).finish()
    }
}

impl Validate for ServiceDescriptionOutput {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::new()
            .required("title", &self.title)
            .required("description", &self.description)
            .max_chars("description", &self.description, 600)
            .finish()
    }
}

impl DraftFlow for ServiceDescription {
    const NAME: &'static str = "service_description";
    const PROMPT: &'static str = "Describe the service \"{{service}}\" for a services section. \
Audience: {{audience}}. Keep the description under 60 words and list up to four features.\n\n\
Features to include:\n{{features}}";
    const OUTPUT_SHAPE: &'static str =
        r#"{"title": "string", "description": "string", "features": ["string", "..."]}"#;

    type Input = ServiceDescriptionInput;
    type Output = ServiceDescriptionOutput;

    fn prompt_vars(input: &Self::Input) -> TemplateVars {
        TemplateVars::from([
            ("service", input.service_name.trim().to_string()),
            ("audience", or_unspecified(&input.audience)),
            ("features", bullets(&input.key_features)),
        ])
    }
}

pub struct ProjectDescription;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDescriptionInput {
    pub project_name: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub outcome: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDescriptionOutput {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Validate for ProjectDescriptionInput {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::new().required("projectName", &self.project_name).finish()
    }
}

impl Validate for ProjectDescriptionOutput {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::new()
            .required("title", &self.title)
            .required("description", &self.description)
            .finish()
    }
}

impl DraftFlow for ProjectDescription {
    const NAME: &'static str = "project_description";
    const PROMPT: &'static str = "Write a portfolio entry for the project \"{{project}}\". \
Outcome: {{outcome}}. Two or three sentences, then short tags.\n\nTechnologies:\n{{technologies}}";
    const OUTPUT_SHAPE: &'static str =
        r#"{"title": "string", "description": "string", "tags": ["string", "..."]}"#;

    type Input = ProjectDescriptionInput;
    type Output = ProjectDescriptionOutput;

    fn prompt_vars(input: &Self::Input) -> TemplateVars {
        TemplateVars::from([
            ("project", input.project_name.trim().to_string()),
            ("outcome", or_unspecified(&input.outcome)),
            ("technologies", bullets(&input.technologies)),
        ])
    }
}

pub struct HeroTagline;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeroTaglineInput {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub specialty: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeroTaglineOutput {
    pub headline: String,
    pub subheadline: String,
}

impl Validate for HeroTaglineInput {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::new()
            .required("name", &self.name)
            .required("role", &self.role)
            .finish()
    }
}

impl Validate for HeroTaglineOutput {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::new()
            .required("headline", &self.headline)
            .max_chars("headline", &self.headline, 120)
            .required("subheadline", &self.subheadline)
            .finish()
    }
}

impl DraftFlow for HeroTagline {
    const NAME: &'static str = "hero_tagline";
    const PROMPT: &'static str = "Write a homepage hero headline and subheadline for {{name}}, \
a {{role}} specialising in {{specialty}}. The headline is under ten words.";
    const OUTPUT_SHAPE: &'static str = r#"{"headline": "string", "subheadline": "string"}"#;
    const TEMPERATURE: f32 = 0.9;

    type Input = HeroTaglineInput;
    type Output = HeroTaglineOutput;

    fn prompt_vars(input: &Self::Input) -> TemplateVars {
        TemplateVars::from([
            ("name", input.name.trim().to_string()),
            ("role", input.role.trim().to_string()),
            ("specialty", or_unspecified(&input.specialty)),
        ])
    }
}

// ── SEO ─────────────────────────────────────────────────────────────

pub const SEO_TITLE_MAX: usize = 70;
pub const SEO_DESCRIPTION_MAX: usize = 170;

pub struct SeoMetadata;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoMetadataInput {
    pub site_name: String,
    pub page_description: String,
    #[serde(default)]
    pub keywords_hint: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeoMetadataOutput {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Validate for SeoMetadataInput {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::new()
            .required("siteName", &self.site_name)
            .required("pageDescription", &self.page_description)
            .finish()
    }
}

impl Validate for SeoMetadataOutput {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::new()
            .required("title", &self.title)
            .max_chars("title", &self.title, SEO_TITLE_MAX)
            .required("description", &self.description)
            .max_chars("description", &self.description, SEO_DESCRIPTION_MAX)
            .finish()
    }
}

impl DraftFlow for SeoMetadata {
    const NAME: &'static str = "seo_metadata";
    const PROMPT: &'static str = "Write SEO metadata for a page on {{site}}. Title at most 60 \
characters, description at most 155 characters, five to eight keywords.\n\n\
Page:\n{{page}}\n\nKeyword ideas:\n{{keywords}}";
    const OUTPUT_SHAPE: &'static str =
        r#"{"title": "string", "description": "string", "keywords": ["string", "..."]}"#;
    const TEMPERATURE: f32 = 0.4;

    type Input = SeoMetadataInput;
    type Output = SeoMetadataOutput;

    fn prompt_vars(input: &Self::Input) -> TemplateVars {
        TemplateVars::from([
            ("site", input.site_name.trim().to_string()),
            ("page", input.page_description.trim().to_string()),
            ("keywords", bullets(&input.keywords_hint)),
        ])
    }
}

// ── Email template ──────────────────────────────────────────────────

/// Drafts one of the notification email templates for the admin to edit.
pub struct EmailTemplateDraft;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplateDraftInput {
    pub template: TemplateId,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplateDraftOutput {
    pub subject: String,
    pub html: String,
}

impl Validate for EmailTemplateDraftInput {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let instructions = self.instructions.as_deref().unwrap_or_default();
        Checks::new().max_chars("instructions", instructions, 2000).finish()
    }
}

impl Validate for EmailTemplateDraftOutput {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut result = Checks::new()
            .required("subject", &self.subject)
            .required("html", &self.html)
            .finish();
        if !self.html.contains("{{name}}") && !self.subject.contains("{{name}}") {
            let err = ValidationError::new("html", "must use the {{name}} placeholder");
            match &mut result {
                Ok(()) => result = Err(vec![err]),
                Err(errors) => errors.push(err),
            }
        }
        result
    }
}

/// Placeholders a template may use, by recipient.
fn placeholders_for(template: TemplateId) -> &'static str {
    match template {
        TemplateId::UserContactConfirmation => "{{name}}, {{message}}, {{site_name}}",
        TemplateId::UserInquiryConfirmation => {
            "{{name}}, {{idea}}, {{project_title_block}}, {{site_name}}"
        }
        TemplateId::AdminContactNotification => {
            "{{name}}, {{email}}, {{message}}, {{kind}}, {{site_name}}"
        }
        TemplateId::AdminInquiryNotification => {
            "{{name}}, {{email}}, {{idea}}, {{project_title_block}}, {{ai_ideas_block}}, \
             {{kind}}, {{site_name}}"
        }
    }
}

fn describe(template: TemplateId) -> &'static str {
    match template {
        TemplateId::UserContactConfirmation => {
            "a confirmation to a visitor who sent a message through the contact form"
        }
        TemplateId::UserInquiryConfirmation => {
            "a confirmation to a visitor who submitted a project inquiry"
        }
        TemplateId::AdminContactNotification => {
            "a notification to the site owner about a new contact message"
        }
        TemplateId::AdminInquiryNotification => {
            "a notification to the site owner about a new project inquiry"
        }
    }
}

impl DraftFlow for EmailTemplateDraft {
    const NAME: &'static str = "email_template_draft";
    const PROMPT: &'static str = "Write an HTML email template: {{purpose}}. Tone: {{tone}}.\n\
Use only these placeholders, written literally with double braces: {{placeholders}}.\n\
Use simple inline HTML (p, strong, br). Extra instructions: {{instructions}}";
    const OUTPUT_SHAPE: &'static str = r#"{"subject": "string", "html": "string"}"#;

    type Input = EmailTemplateDraftInput;
    type Output = EmailTemplateDraftOutput;

    fn prompt_vars(input: &Self::Input) -> TemplateVars {
        TemplateVars::from([
            ("purpose", describe(input.template).to_string()),
            ("tone", or_unspecified(&input.tone)),
            ("placeholders", placeholders_for(input.template).to_string()),
            ("instructions", or_unspecified(&input.instructions)),
        ])
    }
}

// ── Testimonials ────────────────────────────────────────────────────

pub struct TestimonialPolish;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialPolishInput {
    #[serde(default)]
    pub name: Option<String>,
    pub raw_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestimonialPolishOutput {
    pub quote: String,
}

impl Validate for TestimonialPolishInput {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::new()
            .required("rawText", &self.raw_text)
            .max_chars("rawText", &self.raw_text, 2000)
            .finish()
    }
}

impl Validate for TestimonialPolishOutput {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::new().required("quote", &self.quote).finish()
    }
}

impl DraftFlow for TestimonialPolish {
    const NAME: &'static str = "testimonial_polish";
    const PROMPT: &'static str = "Tidy up this client testimonial from {{name}}: fix spelling and \
grammar and keep their voice and meaning. Do not add claims.\n\n{{text}}";
    const OUTPUT_SHAPE: &'static str = r#"{"quote": "string"}"#;
    const TEMPERATURE: f32 = 0.3;

    type Input = TestimonialPolishInput;
    type Output = TestimonialPolishOutput;

    fn prompt_vars(input: &Self::Input) -> TemplateVars {
        TemplateVars::from([
            ("name", or_unspecified(&input.name)),
            ("text", input.raw_text.trim().to_string()),
        ])
    }
}
