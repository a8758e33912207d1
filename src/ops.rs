//! Shared operation wrappers for all interfaces (CLI, plugin).
//!
//! Each `op_*` function is a pure, synchronous wrapper around one or more
//! `algo` stages or `pipeline` jobs. Input and output are
//! `serde_json::Value`, with no dependency on clap or nu-plugin.

use rayon::prelude::*;
use serde_json::Value;

use crate::algo::payload::{
    make_options_from_table, make_property_updates, PropertyDefinition, PropertySettings,
};
use crate::algo::ranking::rank;
use crate::algo::subcategory::{split_categories, SubcategoryRules};
use crate::algo::table::Table;
use crate::algo::taxonomy::Taxonomy;
use crate::algo::tokenizer::{explode, Delimiter};
use crate::error::Result;
use crate::pipeline::{
    classified_only, classify_table, entities_to_table, rollup_table, stages_table, ClassifyConfig,
    RollupConfig, StageConfig,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Read a category list from a row: either a JSON array of labels or a
/// semicolon-joined string. Missing fields give an empty list.
pub fn get_categories(row: &Value, field: &str) -> Vec<String> {
    match row.get(field) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::String(s)) => split_categories(s),
        _ => Vec::new(),
    }
}

fn table_value(table: &Table) -> Value {
    Value::Array(table.to_json_rows())
}

// ── Operations ───────────────────────────────────────────────────────────────

pub fn op_explode(rows: &[Value], id_column: &str, field: &str, delimiter: &str) -> Result<Value> {
    let table = Table::from_json_rows(rows);
    let delimiter = Delimiter::new(delimiter)?;
    let exploded = explode(&table, id_column, field, &delimiter)?;

    let output: Vec<Value> = exploded
        .into_iter()
        .map(|r| {
            let mut obj = serde_json::Map::new();
            obj.insert(id_column.into(), Value::String(r.id));
            obj.insert("token".into(), Value::String(r.token));
            obj.insert("ref".into(), Value::String(r.reference));
            Value::Object(obj)
        })
        .collect();
    Ok(Value::Array(output))
}

/// Classify rows; unclassified entities are dropped unless `keep_unmatched`.
pub fn op_classify(
    rows: &[Value],
    config: &ClassifyConfig,
    taxonomy: &Taxonomy,
    rules: &SubcategoryRules,
    keep_unmatched: bool,
) -> Result<Value> {
    let table = Table::from_json_rows(rows);
    op_classify_table(&table, config, taxonomy, rules, keep_unmatched)
}

pub fn op_classify_table(
    table: &Table,
    config: &ClassifyConfig,
    taxonomy: &Taxonomy,
    rules: &SubcategoryRules,
    keep_unmatched: bool,
) -> Result<Value> {
    let mut entities = classify_table(table, config, taxonomy, rules)?;
    if !keep_unmatched {
        entities = classified_only(entities);
    }
    Ok(table_value(&entities_to_table(&entities, config)))
}

/// Append top-5 and top-1 columns computed from each row's category list.
pub fn op_rank(rows: &[Value], field: &str, top5_column: &str, top1_column: &str) -> Value {
    let output: Vec<Value> = rows
        .par_iter()
        .cloned()
        .map(|mut row| {
            let ranked = rank(get_categories(&row, field));
            if let Some(obj) = row.as_object_mut() {
                obj.insert(top5_column.into(), Value::String(ranked.top5));
                obj.insert(
                    top1_column.into(),
                    ranked.top1.map(Value::String).unwrap_or(Value::Null),
                );
            }
            row
        })
        .collect();
    Value::Array(output)
}

pub fn op_rollup(
    table: &Table,
    links: &Table,
    classify: &ClassifyConfig,
    config: &RollupConfig,
    taxonomy: &Taxonomy,
    rules: &SubcategoryRules,
) -> Result<Value> {
    let out = rollup_table(table, links, classify, config, taxonomy, rules)?;
    Ok(table_value(&out))
}

pub fn op_stages(rows: &[Value], config: &StageConfig) -> Result<Value> {
    let table = Table::from_json_rows(rows);
    Ok(table_value(&stages_table(&table, config)?))
}

pub fn op_properties(rows: &[Value], id_column: &str, column: &str) -> Result<Value> {
    let table = Table::from_json_rows(rows);
    let updates = make_property_updates(&table, id_column, column)?;
    Ok(serde_json::to_value(updates)?)
}

pub fn op_options(rows: &[Value], column: &str) -> Result<Value> {
    let table = Table::from_json_rows(rows);
    let options = make_options_from_table(&table, column)?;
    Ok(serde_json::to_value(options)?)
}

/// Full registration payload for a property built from `column`'s values.
pub fn op_definition(
    rows: &[Value],
    column: &str,
    label: &str,
    settings: &PropertySettings,
) -> Result<PropertyDefinition> {
    let table = Table::from_json_rows(rows);
    let options = make_options_from_table(&table, column)?;
    Ok(PropertyDefinition::new(column, label, options, settings))
}
