//! Icon names for services and contact links.
//!
//! Content stores icons by name; the site renders whichever glyph the name
//! maps to. Unknown names resolve to [`Icon::FALLBACK`] rather than failing.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Icon {
    Code,
    Palette,
    Smartphone,
    Globe,
    Database,
    Cloud,
    ShoppingCart,
    Search,
    PenTool,
    Megaphone,
    Mail,
    Phone,
    MapPin,
    Github,
    Linkedin,
    Twitter,
    Instagram,
    Sparkles,
}

/// Static name table. Lookup is case-insensitive; the first entry for an
/// icon is its canonical name.
static ICON_NAMES: &[(&str, Icon)] = &[
    ("code", Icon::Code),
    ("palette", Icon::Palette),
    ("smartphone", Icon::Smartphone),
    ("mobile", Icon::Smartphone),
    ("globe", Icon::Globe),
    ("web", Icon::Globe),
    ("database", Icon::Database),
    ("cloud", Icon::Cloud),
    ("shopping-cart", Icon::ShoppingCart),
    ("cart", Icon::ShoppingCart),
    ("search", Icon::Search),
    ("pen-tool", Icon::PenTool),
    ("megaphone", Icon::Megaphone),
    ("mail", Icon::Mail),
    ("email", Icon::Mail),
    ("phone", Icon::Phone),
    ("map-pin", Icon::MapPin),
    ("location", Icon::MapPin),
    ("github", Icon::Github),
    ("linkedin", Icon::Linkedin),
    ("twitter", Icon::Twitter),
    ("x", Icon::Twitter),
    ("instagram", Icon::Instagram),
    ("sparkles", Icon::Sparkles),
];

impl Icon {
    /// Shown when a stored name is not in the table.
    pub const FALLBACK: Icon = Icon::Sparkles;

    /// Exact lookup. Accepts `kebab-case`, `snake_case` and `PascalCase`
    /// spellings in any letter case.
    pub fn lookup(name: &str) -> Option<Icon> {
        let normalized = normalize(name);
        ICON_NAMES
            .iter()
            .find(|(key, _)| key.replace('-', "") == normalized)
            .map(|(_, icon)| *icon)
    }

    /// Lookup with fallback.
    pub fn from_name(name: &str) -> Icon {
        Self::lookup(name).unwrap_or_else(|| {
            tracing::debug!(name, "Unknown icon name, using fallback");
            Self::FALLBACK
        })
    }

    pub fn as_str(&self) -> &'static str {
        ICON_NAMES
            .iter()
            .find(|(_, icon)| icon == self)
            .map(|(name, _)| *name)
            .unwrap_or("sparkles")
    }

    /// Every icon, in table order, without aliases.
    pub fn all() -> Vec<Icon> {
        let mut icons: Vec<Icon> = Vec::new();
        for (_, icon) in ICON_NAMES {
            if !icons.contains(icon) {
                icons.push(*icon);
            }
        }
        icons
    }
}

fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

impl Default for Icon {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl std::fmt::Display for Icon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Icon {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Icon {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Icon::from_name(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case_and_separators() {
        assert_eq!(Icon::from_name("ShoppingCart"), Icon::ShoppingCart);
        assert_eq!(Icon::from_name("shopping_cart"), Icon::ShoppingCart);
        assert_eq!(Icon::from_name(" GITHUB "), Icon::Github);
        assert_eq!(Icon::from_name("map-pin"), Icon::MapPin);
    }

    #[test]
    fn aliases_resolve_to_canonical_name() {
        assert_eq!(Icon::from_name("email"), Icon::Mail);
        assert_eq!(Icon::from_name("email").as_str(), "mail");
        assert_eq!(Icon::from_name("mobile").as_str(), "smartphone");
    }

    #[test]
    fn unknown_names_fall_back() {
        assert_eq!(Icon::lookup("unicorn"), None);
        assert_eq!(Icon::from_name("unicorn"), Icon::FALLBACK);
        assert_eq!(Icon::from_name(""), Icon::FALLBACK);
    }

    #[test]
    fn every_icon_round_trips_through_its_name() {
        for icon in Icon::all() {
            assert_eq!(Icon::from_name(icon.as_str()), icon);
        }
        assert_eq!(Icon::all().len(), 18);
    }

    #[test]
    fn serde_uses_names() {
        let json = serde_json::to_string(&Icon::PenTool).unwrap();
        assert_eq!(json, "\"pen-tool\"");
        let icon: Icon = serde_json::from_str("\"Nonsense\"").unwrap();
        assert_eq!(icon, Icon::FALLBACK);
    }
}
