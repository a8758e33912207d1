use std::collections::HashMap;

use crate::algo::taxonomy::Taxonomy;
use crate::algo::tokenizer::{normalize_token, ExplodedRow};

/// Keyword lookup built once per taxonomy.
///
/// Keywords go through the same normalization as tokens, so matching is an
/// exact, case-insensitive comparison. There is no partial matching.
#[derive(Debug, Clone)]
pub struct TaxonomyIndex {
    categories: Vec<String>,
    keywords: HashMap<String, Vec<usize>>,
}

impl TaxonomyIndex {
    pub fn new(taxonomy: &Taxonomy) -> Self {
        let mut keywords: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, cat) in taxonomy.categories.iter().enumerate() {
            for kw in &cat.keywords {
                let ids = keywords.entry(normalize_token(kw)).or_default();
                if !ids.contains(&i) {
                    ids.push(i);
                }
            }
        }
        Self {
            categories: taxonomy.categories.iter().map(|c| c.name.clone()).collect(),
            keywords,
        }
    }

    /// Categories matched by an already-normalized token, in taxonomy order.
    pub fn lookup(&self, token: &str) -> Vec<&str> {
        // ids are pushed while walking categories in order, so already sorted
        self.keywords
            .get(token)
            .map(|ids| ids.iter().map(|&i| self.categories[i].as_str()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

/// An exploded row together with the categories its token matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedRow {
    pub exploded: ExplodedRow,
    pub categories: Vec<String>,
}

impl MappedRow {
    /// Leading-semicolon accumulator, e.g. `";FinTech;Financial Services"`.
    /// Empty when the token matched nothing.
    pub fn accumulator(&self) -> String {
        self.categories.iter().map(|c| format!(";{c}")).collect()
    }
}

/// Map every token against the index. Unmatched tokens keep an empty
/// category list; they are expected and only counted in the debug log.
pub fn map_tokens(rows: Vec<ExplodedRow>, index: &TaxonomyIndex) -> Vec<MappedRow> {
    let mut unmatched = 0usize;
    let mapped: Vec<MappedRow> = rows
        .into_iter()
        .map(|exploded| {
            let categories: Vec<String> = index
                .lookup(&exploded.token)
                .into_iter()
                .map(String::from)
                .collect();
            if categories.is_empty() {
                unmatched += 1;
                tracing::trace!(token = %exploded.token, id = %exploded.id, "unmapped token");
            }
            MappedRow {
                exploded,
                categories,
            }
        })
        .collect();
    tracing::debug!(tokens = mapped.len(), unmatched, "mapped tokens");
    mapped
}
