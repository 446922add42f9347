//! Typed site content documents over the key-value store.
//!
//! Each category lives under one fixed [`ContentKey`] and has compiled-in
//! defaults, so a fresh database renders a complete site. Reads never fail
//! on bad data: a document that no longer matches its type logs a warning
//! and falls back to the default.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ContentError, DatabaseError};
use crate::icons::Icon;
use crate::mail::{EmailTemplate, TemplateId, TemplateSet};
use crate::store::ledger::MessageLog;
use crate::store::traits::KeyValueStore;

/// Storage key of a content category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKey {
    About,
    Services,
    Projects,
    Testimonials,
    ContactInfo,
    NavItems,
    Messages,
    EmailTemplates,
    SiteInfo,
}

impl ContentKey {
    pub const ALL: [ContentKey; 9] = [
        Self::About,
        Self::Services,
        Self::Projects,
        Self::Testimonials,
        Self::ContactInfo,
        Self::NavItems,
        Self::Messages,
        Self::EmailTemplates,
        Self::SiteInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::About => "about",
            Self::Services => "services",
            Self::Projects => "projects",
            Self::Testimonials => "testimonials",
            Self::ContactInfo => "contact_info",
            Self::NavItems => "nav_items",
            Self::Messages => "messages",
            Self::EmailTemplates => "email_templates",
            Self::SiteInfo => "site_info",
        }
    }
}

impl std::fmt::Display for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentKey {
    type Err = ContentError;

    /// Accepts `snake_case` and `kebab-case` names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == normalized)
            .ok_or_else(|| ContentError::UnknownKey(s.to_string()))
    }
}

/// A typed document stored under a fixed key.
pub trait ContentDocument: Serialize + DeserializeOwned + Default + Send + Sync {
    const KEY: ContentKey;
}

// ── Content types ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AboutContent {
    pub heading: String,
    pub body: String,
    pub image_url: Option<String>,
    pub skills: Vec<String>,
}

impl Default for AboutContent {
    fn default() -> Self {
        Self {
            heading: "About me".into(),
            body: "I design and build fast, accessible websites for small businesses \
                   and independent creators."
                .into(),
            image_url: None,
            skills: vec![
                "Web design".into(),
                "Front-end development".into(),
                "Branding".into(),
            ],
        }
    }
}

impl ContentDocument for AboutContent {
    const KEY: ContentKey = ContentKey::About;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub icon: Icon,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Services(pub Vec<Service>);

impl Default for Services {
    fn default() -> Self {
        Self(vec![
            Service {
                id: "web-development".into(),
                title: "Web Development".into(),
                description: "Custom websites built for speed and easy editing.".into(),
                icon: Icon::Code,
                features: vec!["Responsive layouts".into(), "SEO basics".into()],
            },
            Service {
                id: "design".into(),
                title: "Design".into(),
                description: "Visual identity and interface design that fits your brand."
                    .into(),
                icon: Icon::Palette,
                features: vec!["Logos".into(), "Style guides".into()],
            },
            Service {
                id: "ecommerce".into(),
                title: "E-commerce".into(),
                description: "Online shops that are simple to run.".into(),
                icon: Icon::ShoppingCart,
                features: vec!["Product catalogs".into(), "Payments".into()],
            },
        ])
    }
}

impl ContentDocument for Services {
    const KEY: ContentKey = ContentKey::Services;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Projects(pub Vec<Project>);

impl ContentDocument for Projects {
    const KEY: ContentKey = ContentKey::Projects;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
    pub quote: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Testimonials(pub Vec<Testimonial>);

impl ContentDocument for Testimonials {
    const KEY: ContentKey = ContentKey::Testimonials;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLink {
    pub platform: String,
    pub url: String,
    #[serde(default)]
    pub icon: Icon,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactInfo {
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub socials: Vec<SocialLink>,
}

impl ContentDocument for ContactInfo {
    const KEY: ContentKey = ContentKey::ContactInfo;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavItem {
    pub label: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavItems(pub Vec<NavItem>);

impl Default for NavItems {
    fn default() -> Self {
        let item = |label: &str, href: &str| NavItem {
            label: label.into(),
            href: href.into(),
        };
        Self(vec![
            item("Home", "/"),
            item("About", "/#about"),
            item("Services", "/#services"),
            item("Projects", "/#projects"),
            item("Contact", "/#contact"),
        ])
    }
}

impl ContentDocument for NavItems {
    const KEY: ContentKey = ContentKey::NavItems;
}

/// Admin-edited email templates, keyed by template id. Missing ids use
/// the built-in template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailTemplates(pub HashMap<TemplateId, EmailTemplate>);

impl EmailTemplates {
    pub fn template_set(&self) -> TemplateSet {
        TemplateSet::builtin().with_overrides(self.0.clone())
    }
}

impl ContentDocument for EmailTemplates {
    const KEY: ContentKey = ContentKey::EmailTemplates;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteInfo {
    pub site_name: String,
    pub tagline: String,
    pub seo_title: String,
    pub seo_description: String,
    pub keywords: Vec<String>,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            site_name: "Portfolio".into(),
            tagline: "Websites that work as hard as you do.".into(),
            seo_title: "Portfolio | Web design and development".into(),
            seo_description: "Independent web design and development studio.".into(),
            keywords: vec!["web design".into(), "web development".into()],
        }
    }
}

impl ContentDocument for SiteInfo {
    const KEY: ContentKey = ContentKey::SiteInfo;
}

// ── Store ───────────────────────────────────────────────────────────

/// Typed access to site content.
#[derive(Clone)]
pub struct ContentStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ContentStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Stored document, or the default when absent or unreadable.
    pub async fn load<T: ContentDocument>(&self) -> Result<T, DatabaseError> {
        let Some(value) = self.kv.get(T::KEY.as_str()).await? else {
            return Ok(T::default());
        };
        match serde_json::from_value(value) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                warn!(key = %T::KEY, error = %e, "Stored content is unreadable, using defaults");
                Ok(T::default())
            }
        }
    }

    pub async fn save<T: ContentDocument>(&self, doc: &T) -> Result<(), DatabaseError> {
        let value =
            serde_json::to_value(doc).map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        self.kv.set(T::KEY.as_str(), &value).await?;
        debug!(key = %T::KEY, "Content saved");
        Ok(())
    }

    /// Drop the stored document so the category reads as its default.
    pub async fn reset(&self, key: ContentKey) -> Result<bool, DatabaseError> {
        self.kv.delete(key.as_str()).await
    }

    /// Untyped read: the stored document (normalized through its type) or
    /// the category default.
    pub async fn load_json(&self, key: ContentKey) -> Result<serde_json::Value, ContentError> {
        let stored = self.kv.get(key.as_str()).await?;
        let value = match stored {
            Some(value) => match normalize(key, value) {
                Ok(value) => value,
                Err(e) => {
                    warn!(key = %key, error = %e, "Stored content is unreadable, using defaults");
                    default_json(key)?
                }
            },
            None => default_json(key)?,
        };
        Ok(value)
    }

    /// Untyped write. The value must match the category's shape; the
    /// normalized document is stored and returned.
    pub async fn save_json(
        &self,
        key: ContentKey,
        value: serde_json::Value,
    ) -> Result<serde_json::Value, ContentError> {
        let normalized = normalize(key, value).map_err(|e| ContentError::Invalid {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.kv.set(key.as_str(), &normalized).await?;
        debug!(key = %key, "Content saved");
        Ok(normalized)
    }

    /// Email templates with admin overrides applied.
    pub async fn template_set(&self) -> Result<TemplateSet, DatabaseError> {
        Ok(self.load::<EmailTemplates>().await?.template_set())
    }

    pub(crate) fn kv(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }
}

fn round_trip<T: ContentDocument>(
    value: serde_json::Value,
) -> Result<serde_json::Value, serde_json::Error> {
    let doc: T = serde_json::from_value(value)?;
    serde_json::to_value(doc)
}

fn normalize(
    key: ContentKey,
    value: serde_json::Value,
) -> Result<serde_json::Value, serde_json::Error> {
    match key {
        ContentKey::About => round_trip::<AboutContent>(value),
        ContentKey::Services => round_trip::<Services>(value),
        ContentKey::Projects => round_trip::<Projects>(value),
        ContentKey::Testimonials => round_trip::<Testimonials>(value),
        ContentKey::ContactInfo => round_trip::<ContactInfo>(value),
        ContentKey::NavItems => round_trip::<NavItems>(value),
        ContentKey::Messages => round_trip::<MessageLog>(value),
        ContentKey::EmailTemplates => round_trip::<EmailTemplates>(value),
        ContentKey::SiteInfo => round_trip::<SiteInfo>(value),
    }
}

fn default_json(key: ContentKey) -> Result<serde_json::Value, DatabaseError> {
    let value = match key {
        ContentKey::About => serde_json::to_value(AboutContent::default()),
        ContentKey::Services => serde_json::to_value(Services::default()),
        ContentKey::Projects => serde_json::to_value(Projects::default()),
        ContentKey::Testimonials => serde_json::to_value(Testimonials::default()),
        ContentKey::ContactInfo => serde_json::to_value(ContactInfo::default()),
        ContentKey::NavItems => serde_json::to_value(NavItems::default()),
        ContentKey::Messages => serde_json::to_value(MessageLog::default()),
        ContentKey::EmailTemplates => serde_json::to_value(EmailTemplates::default()),
        ContentKey::SiteInfo => serde_json::to_value(SiteInfo::default()),
    };
    value.map_err(|e| DatabaseError::Serialization(e.to_string()))
}
