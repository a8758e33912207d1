use serde::{Deserialize, Serialize};

use crate::algo::taxonomy::xdg_path;
use crate::error::{Error, Result};

const EMBEDDED_RULES: &str = include_str!("../../taxonomies/subcategories.json");

/// When both `child` and `parent` are assigned, `parent` is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcategoryRule {
    pub child: String,
    pub parent: String,
}

/// Ordered rule table. Each rule sees the list as reduced by the rules
/// before it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubcategoryRules {
    pub name: String,
    pub rules: Vec<SubcategoryRule>,
}

impl SubcategoryRules {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            name: "custom".into(),
            rules: pairs
                .iter()
                .map(|(child, parent)| SubcategoryRule {
                    child: child.to_string(),
                    parent: parent.to_string(),
                })
                .collect(),
        }
    }

    /// Drop general categories that are shadowed by a specific one.
    pub fn resolve(&self, categories: &[String]) -> Vec<String> {
        let mut current: Vec<String> = categories.to_vec();
        for rule in &self.rules {
            let has = |label: &str| current.iter().any(|c| c == label);
            if has(&rule.child) && has(&rule.parent) {
                current.retain(|c| c != &rule.parent);
            }
        }
        current
    }

    /// Resolve a semicolon-joined string and re-join it.
    pub fn resolve_joined(&self, joined: &str) -> String {
        join_categories(&self.resolve(&split_categories(joined)))
    }
}

/// Split a `";A;B"` string, dropping empty segments.
pub fn split_categories(joined: &str) -> Vec<String> {
    joined
        .split(';')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Join categories with a leading semicolon: `["A", "B"]` → `";A;B"`.
pub fn join_categories<S: AsRef<str>>(categories: &[S]) -> String {
    categories.iter().map(|c| format!(";{}", c.as_ref())).collect()
}

/// Load the rule table: explicit path, then `$SECTORS_RULES`, then
/// `$XDG_DATA_HOME/sectors/subcategories.json`, then the embedded table.
pub fn resolve_rules(path: Option<&str>) -> Result<SubcategoryRules> {
    if let Some(p) = path {
        return load_rules(p);
    }
    if let Ok(p) = std::env::var("SECTORS_RULES") {
        if let Ok(rules) = load_rules(&p) {
            return Ok(rules);
        }
    }
    if let Some(p) = xdg_path("subcategories.json") {
        if p.exists() {
            if let Ok(rules) = load_rules(&p.to_string_lossy()) {
                return Ok(rules);
            }
        }
    }
    Ok(default_rules())
}

pub fn default_rules() -> SubcategoryRules {
    parse_rules(EMBEDDED_RULES).expect("embedded subcategory rules are invalid JSON")
}

pub fn parse_rules(json: &str) -> Result<SubcategoryRules> {
    serde_json::from_str(json)
        .map_err(|e| Error::Taxonomy(format!("Failed to parse subcategory rules: {e}")))
}

pub fn load_rules(path: &str) -> Result<SubcategoryRules> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| Error::Taxonomy(format!("Failed to read '{path}': {e}")))?;
    parse_rules(&json)
}
