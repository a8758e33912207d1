//! Portfolio rollups: an investor's categories are the categories of the
//! companies it is linked to, with one entry per (link, category).

use std::collections::HashMap;

use crate::algo::aggregate::Entity;
use crate::algo::ranking::{rank, RankedCategories};
use crate::algo::table::Table;
use crate::algo::taxonomy::TaxonomyKind;
use crate::error::Result;

/// Output column names for a rollup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollupColumns {
    pub all: String,
    pub top5: String,
    pub top1: String,
}

impl RollupColumns {
    /// CRM property names used for portfolio rollups of each taxonomy.
    pub fn for_kind(kind: TaxonomyKind) -> Self {
        let suffix = match kind {
            TaxonomyKind::Industries => "inds",
            TaxonomyKind::Tags => "tags",
        };
        Self {
            all: format!("pf_{suffix}"),
            top5: format!("top5_{suffix}"),
            top1: format!("top1_{suffix}"),
        }
    }
}

/// Categories observed for one rollup entity, repeats included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rollup {
    pub id: String,
    pub categories: Vec<String>,
}

impl Rollup {
    /// Distinct categories in first-seen order.
    pub fn distinct(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for c in &self.categories {
            if !seen.contains(&c.as_str()) {
                seen.push(c);
            }
        }
        seen
    }

    pub fn ranked(&self) -> RankedCategories {
        rank(&self.categories)
    }
}

/// Walk the link table and collect linked entities' categories per rollup
/// id. `entity_key` names the entity field that link keys refer to; `"id"`
/// means the entity id itself. Links that resolve to no classified entity
/// contribute nothing, and rollup ids with no categories are omitted.
pub fn rollup(
    entities: &[Entity],
    entity_key: &str,
    links: &Table,
    link_id_column: &str,
    link_key_column: &str,
) -> Result<Vec<Rollup>> {
    let id_col = links.column(link_id_column)?;
    let key_col = links.column(link_key_column)?;

    let mut by_key: HashMap<&str, &Entity> = HashMap::new();
    for e in entities {
        let key = if entity_key == "id" {
            Some(e.id.as_str())
        } else {
            e.field(entity_key)
        };
        if let Some(k) = key {
            by_key.entry(k).or_insert(e);
        }
    }

    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut rollups: Vec<Rollup> = Vec::new();
    let mut unresolved = 0usize;
    for row in 0..links.len() {
        let (Some(id), Some(key)) = (links.cell(row, id_col), links.cell(row, key_col)) else {
            continue;
        };
        let Some(entity) = by_key.get(key).filter(|e| !e.categories.is_empty()) else {
            unresolved += 1;
            continue;
        };
        let pos = *positions.entry(id).or_insert_with(|| {
            rollups.push(Rollup {
                id: id.to_string(),
                categories: Vec::new(),
            });
            rollups.len() - 1
        });
        rollups[pos].categories.extend(entity.categories.iter().cloned());
    }

    tracing::debug!(links = links.len(), rollups = rollups.len(), unresolved, "rolled up links");
    Ok(rollups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(id: &str, href: &str, cats: &[&str]) -> Entity {
        let mut e = Entity::new(id);
        e.fields.push(("href".into(), Some(href.into())));
        for c in cats {
            e.add_category(c);
        }
        e
    }

    #[test]
    fn rollup_through_links() {
        let entities = vec![
            entity("s1", "/a", &["SaaS", "FinTech"]),
            entity("s2", "/b", &["SaaS"]),
            entity("s3", "/c", &[]),
        ];
        let links = Table::from_json_rows(&[
            json!({"id": "inv1", "startup_href": "/a"}),
            json!({"id": "inv1", "startup_href": "/b"}),
            json!({"id": "inv1", "startup_href": "/missing"}),
            json!({"id": "inv2", "startup_href": "/c"}),
        ]);
        let rollups = rollup(&entities, "href", &links, "id", "startup_href").unwrap();
        assert_eq!(rollups.len(), 1);
        assert_eq!(rollups[0].categories, vec!["SaaS", "FinTech", "SaaS"]);
        assert_eq!(rollups[0].distinct(), vec!["SaaS", "FinTech"]);
        let ranked = rollups[0].ranked();
        assert_eq!(ranked.top1.as_deref(), Some("SaaS"));
        assert_eq!(ranked.top5, ";SaaS;FinTech");
    }

    #[test]
    fn rollup_by_entity_id() {
        let entities = vec![entity("s1", "/a", &["Health"])];
        let links = Table::from_json_rows(&[json!({"investor": "i", "company": "s1"})]);
        let rollups = rollup(&entities, "id", &links, "investor", "company").unwrap();
        assert_eq!(rollups[0].id, "i");
    }

    #[test]
    fn column_names_per_kind() {
        let cols = RollupColumns::for_kind(TaxonomyKind::Tags);
        assert_eq!(cols.all, "pf_tags");
        assert_eq!(cols.top1, "top1_tags");
    }
}
