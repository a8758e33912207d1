//! End-to-end jobs built from the `algo` stages.
//!
//! Each function is a whole-table transform: read a table, return a new
//! one keyed by the same ids. Nothing here touches the CRM.

use chrono::NaiveDate;

use crate::algo::aggregate::{aggregate, apply_description_rules, Entity};
use crate::algo::mapper::{map_tokens, TaxonomyIndex};
use crate::algo::rollup::{rollup, RollupColumns};
use crate::algo::stages::{collect_stages, default_since};
use crate::algo::subcategory::{join_categories, SubcategoryRules};
use crate::algo::table::Table;
use crate::algo::taxonomy::{Taxonomy, TaxonomyKind};
use crate::algo::tokenizer::{explode, Delimiter};
use crate::error::Result;

/// Description column checked by default when a table has one.
pub const DEFAULT_DESCRIPTION_COLUMN: &str = "description";

/// Column layout and switches for one classification run.
#[derive(Debug, Clone)]
pub struct ClassifyConfig {
    pub id_column: String,
    /// Free-text, delimiter-joined field to classify.
    pub field: String,
    /// Regex pattern between phrases; surrounding whitespace is absorbed.
    pub delimiter: String,
    /// Name of the output category column.
    pub output_column: String,
    /// Column checked by the taxonomy's description rules, if any.
    pub description_column: Option<String>,
    /// Scalar columns copied onto each entity.
    pub carry_columns: Vec<String>,
    pub resolve_subcategories: bool,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            id_column: "id".into(),
            field: "industries".into(),
            delimiter: ",".into(),
            output_column: "pf_inds".into(),
            description_column: None,
            carry_columns: Vec::new(),
            resolve_subcategories: true,
        }
    }
}

impl ClassifyConfig {
    /// Defaults for a taxonomy: industries write `pf_inds`, tags `pf_tags`.
    /// Both resolve subcategories; rules naming labels a taxonomy lacks
    /// never fire.
    pub fn for_kind(kind: TaxonomyKind) -> Self {
        let columns = RollupColumns::for_kind(kind);
        Self {
            output_column: columns.all,
            ..Self::default()
        }
    }

    /// Use [`DEFAULT_DESCRIPTION_COLUMN`] when none is set and `table` has it.
    pub fn with_default_description(mut self, table: &Table) -> Self {
        if self.description_column.is_none() && table.has_column(DEFAULT_DESCRIPTION_COLUMN) {
            self.description_column = Some(DEFAULT_DESCRIPTION_COLUMN.into());
        }
        self
    }

    fn carried(&self) -> Vec<&str> {
        let mut cols: Vec<&str> = self.carry_columns.iter().map(String::as_str).collect();
        if let Some(desc) = &self.description_column {
            if !cols.contains(&desc.as_str()) {
                cols.push(desc);
            }
        }
        cols
    }
}

/// Explode, map, aggregate, apply description rules, resolve.
///
/// Every entity with at least one token is returned, classified or not;
/// use [`classified_only`] for the rows worth writing back.
pub fn classify_table(
    table: &Table,
    config: &ClassifyConfig,
    taxonomy: &Taxonomy,
    rules: &SubcategoryRules,
) -> Result<Vec<Entity>> {
    let delimiter = Delimiter::new(&config.delimiter)?;
    let exploded = explode(table, &config.id_column, &config.field, &delimiter)?;
    let index = TaxonomyIndex::new(taxonomy);
    let mapped = map_tokens(exploded, &index);
    let mut entities = aggregate(table, &mapped, &config.carried())?;

    if let Some(desc) = &config.description_column {
        entities = apply_description_rules(entities, desc, &taxonomy.description_rules);
    }

    if config.resolve_subcategories {
        for entity in &mut entities {
            entity.categories = rules.resolve(&entity.categories);
        }
    }

    tracing::debug!(
        taxonomy = %taxonomy.name,
        entities = entities.len(),
        classified = entities.iter().filter(|e| !e.categories.is_empty()).count(),
        "classified table"
    );
    Ok(entities)
}

/// Drop entities that matched no category.
pub fn classified_only(entities: Vec<Entity>) -> Vec<Entity> {
    entities
        .into_iter()
        .filter(|e| !e.categories.is_empty())
        .collect()
}

/// Tabulate entities: id, category column (leading-semicolon string, missing
/// when empty), then carried columns.
pub fn entities_to_table(entities: &[Entity], config: &ClassifyConfig) -> Table {
    let mut headers = vec![config.id_column.clone(), config.output_column.clone()];
    let carried = config.carried();
    headers.extend(carried.iter().map(|c| c.to_string()));

    let mut table = Table::new(headers);
    for e in entities {
        let joined = e.joined_categories();
        let mut row = vec![
            Some(e.id.clone()),
            if joined.is_empty() { None } else { Some(joined) },
        ];
        row.extend(carried.iter().map(|c| e.field(c).map(String::from)));
        table.push_row(row);
    }
    table
}

/// How to find each rollup entity's linked sub-entities.
#[derive(Debug, Clone)]
pub struct RollupConfig {
    /// Entity field the link keys refer to (`"id"` for the entity id).
    pub entity_key: String,
    pub link_id_column: String,
    pub link_key_column: String,
    pub columns: RollupColumns,
}

impl RollupConfig {
    pub fn for_kind(kind: TaxonomyKind) -> Self {
        Self {
            entity_key: "href".into(),
            link_id_column: "id".into(),
            link_key_column: "startup_href".into(),
            columns: RollupColumns::for_kind(kind),
        }
    }
}

/// Classify sub-entities, roll them up through `links`, and rank.
///
/// Description rules run against the `description` column when the
/// sub-entity table has one and no other column was configured.
///
/// Output columns: link id column, all distinct categories, top five,
/// top one.
pub fn rollup_table(
    table: &Table,
    links: &Table,
    classify: &ClassifyConfig,
    config: &RollupConfig,
    taxonomy: &Taxonomy,
    rules: &SubcategoryRules,
) -> Result<Table> {
    let mut classify = classify.clone().with_default_description(table);
    if config.entity_key != "id" && !classify.carry_columns.contains(&config.entity_key) {
        classify.carry_columns.push(config.entity_key.clone());
    }
    let entities = classified_only(classify_table(table, &classify, taxonomy, rules)?);
    let rollups = rollup(
        &entities,
        &config.entity_key,
        links,
        &config.link_id_column,
        &config.link_key_column,
    )?;

    let mut out = Table::new(vec![
        config.link_id_column.clone(),
        config.columns.all.clone(),
        config.columns.top5.clone(),
        config.columns.top1.clone(),
    ]);
    for r in &rollups {
        let ranked = r.ranked();
        out.push_row(vec![
            Some(r.id.clone()),
            Some(join_categories(&r.distinct())),
            Some(ranked.top5),
            ranked.top1,
        ]);
    }
    Ok(out)
}

/// Column layout for investor stage rollups.
#[derive(Debug, Clone)]
pub struct StageConfig {
    pub id_column: String,
    pub stage_column: String,
    pub date_column: String,
    pub output_column: String,
    pub since: NaiveDate,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            id_column: "id".into(),
            stage_column: "stage".into(),
            date_column: "date".into(),
            output_column: "stage".into(),
            since: default_since(),
        }
    }
}

pub fn stages_table(table: &Table, config: &StageConfig) -> Result<Table> {
    let stages = collect_stages(
        table,
        &config.id_column,
        &config.stage_column,
        &config.date_column,
        config.since,
    )?;
    let mut out = Table::new(vec![config.id_column.clone(), config.output_column.clone()]);
    for s in stages.iter().filter(|s| !s.stages.is_empty()) {
        out.push_row(vec![Some(s.id.clone()), Some(s.joined())]);
    }
    Ok(out)
}

/// A table joined against a CRM export, and the column holding the
/// export's record ids.
#[derive(Debug, Clone)]
pub struct AttachedIds {
    pub table: Table,
    pub id_column: String,
}

/// Pull CRM record ids from an export by joining on one or more columns;
/// rows that found no id are dropped. When `table` already has a column
/// named `export_id_column`, the export's ids land in `<name>_right`.
pub fn attach_ids(
    table: &Table,
    export: &Table,
    left_on: &[&str],
    right_on: &[&str],
    export_id_column: &str,
) -> Result<AttachedIds> {
    let mut joined = table.left_join(export, left_on, right_on)?;
    let id_column = if table.has_column(export_id_column) {
        format!("{export_id_column}_right")
    } else {
        export_id_column.to_string()
    };
    let id_col = joined.column(&id_column)?;
    let before = joined.len();
    joined.retain_rows(|row| row[id_col].is_some());
    tracing::debug!(rows = before, matched = joined.len(), id_column, "attached record ids");
    Ok(AttachedIds {
        table: joined,
        id_column,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::subcategory::default_rules;
    use crate::algo::taxonomy::{embedded_default_json, parse_taxonomy};
    use serde_json::json;

    fn industries() -> Taxonomy {
        parse_taxonomy(embedded_default_json(TaxonomyKind::Industries)).unwrap()
    }

    #[test]
    fn mental_health_description_suppresses_health() {
        let table = Table::from_json_rows(&[json!({
            "id": "1",
            "industries": "Health Care",
            "description": "A MENTAL HEALTH companion app",
        })]);
        let config = ClassifyConfig {
            description_column: Some("description".into()),
            ..ClassifyConfig::default()
        };
        let entities = classify_table(&table, &config, &industries(), &default_rules()).unwrap();
        assert_eq!(entities[0].categories, vec!["Mental Health"]);
    }

    #[test]
    fn unmatched_entities_survive_until_filtered() {
        let table = Table::from_json_rows(&[
            json!({"id": "1", "industries": "FinTech, Financial Services"}),
            json!({"id": "2", "industries": "Underwater Basket Weaving"}),
        ]);
        let entities =
            classify_table(&table, &ClassifyConfig::default(), &industries(), &default_rules()).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].categories, vec!["FinTech"]);
        let kept = classified_only(entities);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "1");
    }

    #[test]
    fn entities_table_shape() {
        let mut e = Entity::new("9");
        e.add_category("SaaS");
        let config = ClassifyConfig::default();
        let t = entities_to_table(&[e, Entity::new("10")], &config);
        assert_eq!(t.headers(), &["id".to_string(), "pf_inds".to_string()]);
        assert_eq!(t.cell(0, 1), Some(";SaaS"));
        assert_eq!(t.cell(1, 1), None);
    }

    #[test]
    fn stages_table_drops_empty() {
        let table = Table::from_json_rows(&[
            json!({"id": "1", "stage": "Seed Round from X", "date": "2021-01-01"}),
            json!({"id": "2", "stage": "Unknown", "date": "2021-01-01"}),
        ]);
        let out = stages_table(&table, &StageConfig::default()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.cell(0, 1), Some(";Seed Round"));
    }

    #[test]
    fn attach_ids_keeps_matches() {
        let table = Table::from_json_rows(&[
            json!({"Investor Name": "Ann Lee", "Description": "angel", "tx_angel_inds": ";SaaS"}),
            json!({"Investor Name": "Nobody", "Description": "x", "tx_angel_inds": ";SaaS"}),
        ]);
        let export = Table::from_json_rows(&[
            json!({"name": "Ann Lee", "About": "angel", "id": "501"}),
        ]);
        let out = attach_ids(&table, &export, &["Investor Name", "Description"], &["name", "About"], "id")
            .unwrap();
        assert_eq!(out.id_column, "id");
        assert_eq!(out.table.len(), 1);
        let id = out.table.column("id").unwrap();
        assert_eq!(out.table.cell(0, id), Some("501"));
    }

    #[test]
    fn attach_ids_uses_export_ids_when_names_clash() {
        let table = Table::from_json_rows(&[
            json!({"id": "1", "name": "Ann", "pf_inds": ";SaaS"}),
            json!({"id": "2", "name": "Bo", "pf_inds": ";Health"}),
        ]);
        let export = Table::from_json_rows(&[json!({"id": "900", "full": "Ann"})]);
        let out = attach_ids(&table, &export, &["name"], &["full"], "id").unwrap();
        assert_eq!(out.id_column, "id_right");
        assert_eq!(out.table.len(), 1);
        let id = out.table.column(&out.id_column).unwrap();
        assert_eq!(out.table.cell(0, id), Some("900"));
        assert_eq!(out.table.cell(0, 0), Some("1"));
    }

    #[test]
    fn rollup_applies_description_rules() {
        let startups = Table::from_json_rows(&[json!({
            "id": "1",
            "href": "/s/calm",
            "industries": "Health Care",
            "description": "A mental health app",
        })]);
        let links = Table::from_json_rows(&[json!({"id": "vc1", "startup_href": "/s/calm"})]);
        let out = rollup_table(
            &startups,
            &links,
            &ClassifyConfig::for_kind(TaxonomyKind::Industries),
            &RollupConfig::for_kind(TaxonomyKind::Industries),
            &industries(),
            &default_rules(),
        )
        .unwrap();
        assert_eq!(out.cell(0, 1), Some(";Mental Health"));
        assert_eq!(out.cell(0, 3), Some("Mental Health"));
    }

    #[test]
    fn tags_resolve_by_default() {
        assert!(ClassifyConfig::for_kind(TaxonomyKind::Tags).resolve_subcategories);
        let rules = SubcategoryRules::from_pairs(&[("Digital Health", "B2C")]);
        let table = Table::from_json_rows(&[json!({"id": "1", "tags": "Consumer, Telehealth"})]);
        let config = ClassifyConfig {
            field: "tags".into(),
            ..ClassifyConfig::for_kind(TaxonomyKind::Tags)
        };
        let tags = parse_taxonomy(embedded_default_json(TaxonomyKind::Tags)).unwrap();
        let entities = classify_table(&table, &config, &tags, &rules).unwrap();
        assert_eq!(entities[0].categories, vec!["Digital Health"]);
    }
}
