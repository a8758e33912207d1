use std::collections::HashMap;

use crate::algo::mapper::MappedRow;
use crate::algo::subcategory::join_categories;
use crate::algo::table::Table;
use crate::algo::taxonomy::DescriptionRule;
use crate::error::Result;

/// One row per source entity after grouping exploded tokens back together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub id: String,
    /// Distinct categories in first-seen order.
    pub categories: Vec<String>,
    /// Carried scalar columns, one representative value each.
    pub fields: Vec<(String, Option<String>)>,
}

impl Entity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            categories: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Add a category unless it is already present.
    pub fn add_category(&mut self, category: &str) {
        if !self.categories.iter().any(|c| c == category) {
            self.categories.push(category.to_string());
        }
    }

    /// Leading-semicolon form, `""` when nothing matched.
    pub fn joined_categories(&self) -> String {
        join_categories(&self.categories)
    }
}

/// Group mapped rows by entity id.
///
/// Categories are unioned per entity. Each carried column takes the first
/// non-missing value seen for the entity; rows of one entity are expected to
/// agree, and disagreement is not checked. Every id present in `mapped`
/// appears exactly once in the output, in first-seen order.
pub fn aggregate(table: &Table, mapped: &[MappedRow], carry_columns: &[&str]) -> Result<Vec<Entity>> {
    let carried: Vec<(String, usize)> = carry_columns
        .iter()
        .map(|&c| table.column(c).map(|i| (c.to_string(), i)))
        .collect::<Result<_>>()?;

    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut entities: Vec<Entity> = Vec::new();

    for m in mapped {
        let pos = *positions.entry(m.exploded.id.as_str()).or_insert_with(|| {
            let mut e = Entity::new(m.exploded.id.clone());
            e.fields = carried.iter().map(|(name, _)| (name.clone(), None)).collect();
            entities.push(e);
            entities.len() - 1
        });
        let entity = &mut entities[pos];
        for cat in &m.categories {
            entity.add_category(cat);
        }
        for (slot, (_, col)) in entity.fields.iter_mut().zip(&carried) {
            if slot.1.is_none() {
                slot.1 = table.cell(m.exploded.row, *col).map(String::from);
            }
        }
    }

    tracing::debug!(rows = mapped.len(), entities = entities.len(), "aggregated entities");
    Ok(entities)
}

/// Force-add categories whose trigger phrase appears in the description
/// (case-insensitive substring). Entities without a description are left
/// as they are.
pub fn apply_description_rules(
    mut entities: Vec<Entity>,
    description_column: &str,
    rules: &[DescriptionRule],
) -> Vec<Entity> {
    if rules.is_empty() {
        return entities;
    }
    let phrases: Vec<(String, &str)> = rules
        .iter()
        .map(|r| (r.phrase.to_lowercase(), r.category.as_str()))
        .collect();

    let mut added = 0usize;
    for entity in &mut entities {
        let Some(description) = entity.field(description_column).map(str::to_lowercase) else {
            continue;
        };
        for (phrase, category) in &phrases {
            if description.contains(phrase.as_str()) {
                entity.add_category(category);
                added += 1;
            }
        }
    }
    tracing::debug!(added, "applied description rules");
    entities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::tokenizer::ExplodedRow;
    use serde_json::json;

    fn mapped(row: usize, id: &str, cats: &[&str]) -> MappedRow {
        MappedRow {
            exploded: ExplodedRow {
                row,
                id: id.into(),
                token: String::new(),
                reference: String::new(),
            },
            categories: cats.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn table() -> Table {
        Table::from_json_rows(&[
            json!({"id": "a", "name": "Acme", "description": "Mental Health app"}),
            json!({"id": "b", "name": "Beta", "description": null}),
        ])
    }

    #[test]
    fn union_and_representative_fields() {
        let rows = vec![
            mapped(0, "a", &["SaaS", "FinTech"]),
            mapped(0, "a", &["FinTech"]),
            mapped(1, "b", &[]),
        ];
        let entities = aggregate(&table(), &rows, &["name"]).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].categories, vec!["SaaS", "FinTech"]);
        assert_eq!(entities[0].field("name"), Some("Acme"));
        assert!(entities[1].categories.is_empty());
        assert_eq!(entities[1].joined_categories(), "");
    }

    #[test]
    fn missing_carry_column() {
        let rows = vec![mapped(0, "a", &[])];
        assert!(aggregate(&table(), &rows, &["href"]).is_err());
    }

    #[test]
    fn description_rule_force_adds() {
        let rows = vec![mapped(0, "a", &["Health"]), mapped(1, "b", &["Health"])];
        let entities = aggregate(&table(), &rows, &["description"]).unwrap();
        let rules = vec![DescriptionRule {
            phrase: "mental health".into(),
            category: "Mental Health".into(),
        }];
        let entities = apply_description_rules(entities, "description", &rules);
        assert_eq!(entities[0].categories, vec!["Health", "Mental Health"]);
        assert_eq!(entities[1].categories, vec!["Health"]);
    }
}
