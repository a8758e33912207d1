use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Embedded defaults, compiled from `taxonomies/*.json`.
/// Users override by placing a file at `$XDG_DATA_HOME/sectors/<kind>.json`,
/// setting `$SECTORS_INDUSTRIES` / `$SECTORS_TAGS`, or passing `--taxonomy <path>`.
const EMBEDDED_INDUSTRIES: &str = include_str!("../../taxonomies/industries.json");
const EMBEDDED_TAGS: &str = include_str!("../../taxonomies/tags.json");

/// Which of the two controlled vocabularies to map against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyKind {
    Industries,
    Tags,
}

impl TaxonomyKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "industries" | "industry" | "inds" => Some(Self::Industries),
            "tags" | "tag" => Some(Self::Tags),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Industries => "industries",
            Self::Tags => "tags",
        }
    }

    fn env_var(self) -> &'static str {
        match self {
            Self::Industries => "SECTORS_INDUSTRIES",
            Self::Tags => "SECTORS_TAGS",
        }
    }

    fn embedded(self) -> &'static str {
        match self {
            Self::Industries => EMBEDDED_INDUSTRIES,
            Self::Tags => EMBEDDED_TAGS,
        }
    }
}

/// A canonical category and the raw tokens that map onto it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub keywords: Vec<String>,
}

/// Force-assigns `category` when an entity description mentions `phrase`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionRule {
    pub phrase: String,
    pub category: String,
}

/// A keyword dictionary. Category order is significant: matches are
/// reported in this order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Taxonomy {
    pub name: String,
    pub version: String,
    pub categories: Vec<Category>,
    #[serde(default)]
    pub description_rules: Vec<DescriptionRule>,
}

impl Taxonomy {
    /// Get category names as a flat list.
    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }
}

/// Load the taxonomy for `kind` using this resolution order:
///
/// 1. `$SECTORS_INDUSTRIES` / `$SECTORS_TAGS` env var (path to JSON file)
/// 2. `$XDG_DATA_HOME/sectors/<kind>.json` (user override)
/// 3. `~/.local/share/sectors/<kind>.json` (fallback XDG path)
/// 4. Embedded compile-time default from `taxonomies/<kind>.json`
///
/// Any resolution step that fails silently falls through to the next.
pub fn default_taxonomy(kind: TaxonomyKind) -> Taxonomy {
    if let Ok(path) = std::env::var(kind.env_var()) {
        if let Ok(tax) = load_taxonomy(&path) {
            return tax;
        }
    }

    if let Some(path) = xdg_path(&format!("{}.json", kind.name())) {
        if path.exists() {
            if let Ok(json) = std::fs::read_to_string(&path) {
                if let Ok(tax) = parse_taxonomy(&json) {
                    return tax;
                }
            }
        }
    }

    parse_taxonomy(kind.embedded()).expect("embedded default taxonomy is invalid JSON")
}

/// Explicit path wins; otherwise fall back to [`default_taxonomy`].
pub fn resolve_taxonomy(kind: TaxonomyKind, path: Option<&str>) -> Result<Taxonomy> {
    match path {
        Some(p) => load_taxonomy(p),
        None => Ok(default_taxonomy(kind)),
    }
}

/// Parse a taxonomy from a JSON string.
pub fn parse_taxonomy(json: &str) -> Result<Taxonomy> {
    serde_json::from_str(json).map_err(|e| Error::Taxonomy(format!("Failed to parse taxonomy: {e}")))
}

/// Load taxonomy from a file path.
pub fn load_taxonomy(path: &str) -> Result<Taxonomy> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| Error::Taxonomy(format!("Failed to read '{path}': {e}")))?;
    parse_taxonomy(&json)
}

/// Return the XDG data path for a file under `sectors/`.
pub(crate) fn xdg_path(file: &str) -> Option<PathBuf> {
    let data_home = std::env::var("XDG_DATA_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".local/share"))
        })?;
    Some(data_home.join("sectors").join(file))
}

/// Return the embedded default taxonomy as a JSON string.
/// Useful for exporting/seeding user-customizable files.
pub fn embedded_default_json(kind: TaxonomyKind) -> &'static str {
    kind.embedded()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedded(kind: TaxonomyKind) -> Taxonomy {
        parse_taxonomy(embedded_default_json(kind)).unwrap()
    }

    #[test]
    fn embedded_industries_parse() {
        let t = embedded(TaxonomyKind::Industries);
        assert_eq!(t.name, "industries");
        assert!(t.category_names().contains(&"FinTech".to_string()));
        assert_eq!(t.description_rules.len(), 1);
    }

    #[test]
    fn embedded_tags_parse() {
        let t = embedded(TaxonomyKind::Tags);
        assert_eq!(t.name, "tags");
        assert!(t.description_rules.is_empty());
    }

    #[test]
    fn each_category_has_keywords() {
        for kind in [TaxonomyKind::Industries, TaxonomyKind::Tags] {
            for cat in &embedded(kind).categories {
                assert!(!cat.keywords.is_empty(), "Category '{}' has no keywords", cat.name);
            }
        }
    }

    #[test]
    fn description_rules_default_to_empty() {
        let t = parse_taxonomy(r#"{"name":"x","version":"1","categories":[]}"#).unwrap();
        assert!(t.description_rules.is_empty());
    }

    #[test]
    fn bad_json_is_taxonomy_error() {
        assert!(matches!(parse_taxonomy("{"), Err(Error::Taxonomy(_))));
    }

    #[test]
    fn kind_from_str() {
        assert_eq!(TaxonomyKind::from_str("Tags"), Some(TaxonomyKind::Tags));
        assert_eq!(TaxonomyKind::from_str("inds"), Some(TaxonomyKind::Industries));
        assert_eq!(TaxonomyKind::from_str("stages"), None);
    }
}
