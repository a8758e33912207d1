//! CRM payload shapes: per-record property updates and the option list
//! that registers an enumerated property's allowed values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::algo::table::Table;
use crate::error::Result;

/// Internal CRM value for a label: spaces become underscores, lowercased.
pub fn normalize_value(label: &str) -> String {
    label.replace(' ', "_").to_lowercase()
}

/// `{id, properties: {column: value}}` for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyUpdate {
    pub id: String,
    pub properties: BTreeMap<String, String>,
}

/// One allowed value of an enumerated property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyOption {
    pub label: String,
    pub value: String,
    pub display_order: usize,
    pub hidden: bool,
}

/// Caller-chosen settings for a property registration.
///
/// Defaults match the category fields: an enumeration rendered as
/// checkboxes, display order 1, not required on forms, editable, and
/// searchable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySettings {
    pub data_type: String,
    pub field_type: String,
    pub group_name: String,
    pub display_order: i64,
    pub form_required: bool,
    pub read_only: bool,
    pub searchable: bool,
}

impl Default for PropertySettings {
    fn default() -> Self {
        Self {
            data_type: "enumeration".into(),
            field_type: "checkbox".into(),
            group_name: "companyinformation".into(),
            display_order: 1,
            form_required: false,
            read_only: false,
            searchable: true,
        }
    }
}

/// Who may change a property's values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationMetadata {
    pub read_only_value: bool,
    pub read_only_definition: bool,
    pub archivable: bool,
}

/// Schema registration payload for an enumerated property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDefinition {
    pub name: String,
    pub label: String,
    /// Data type, e.g. `enumeration`.
    #[serde(rename = "type")]
    pub data_type: String,
    /// Widget, e.g. `checkbox` or `select`.
    pub field_type: String,
    pub group_name: String,
    pub options: Vec<PropertyOption>,
    pub display_order: i64,
    /// Shown (and required) on forms.
    pub form_field: bool,
    pub modification_metadata: ModificationMetadata,
    pub searchable_in_global_search: bool,
    pub hidden: bool,
    pub has_unique_value: bool,
}

impl PropertyDefinition {
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        options: Vec<PropertyOption>,
        settings: &PropertySettings,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            data_type: settings.data_type.clone(),
            field_type: settings.field_type.clone(),
            group_name: settings.group_name.clone(),
            options,
            display_order: settings.display_order,
            form_field: settings.form_required,
            modification_metadata: ModificationMetadata {
                read_only_value: settings.read_only,
                read_only_definition: false,
                archivable: true,
            },
            searchable_in_global_search: settings.searchable,
            hidden: false,
            has_unique_value: false,
        }
    }

    /// Multi-select checkbox property with default settings in `group_name`.
    pub fn checkbox(
        name: impl Into<String>,
        label: impl Into<String>,
        group_name: impl Into<String>,
        options: Vec<PropertyOption>,
    ) -> Self {
        let settings = PropertySettings {
            group_name: group_name.into(),
            ..PropertySettings::default()
        };
        Self::new(name, label, options, &settings)
    }
}

/// One update per row whose `column` is present; rows with a missing
/// value are skipped rather than written blank.
pub fn make_property_updates(table: &Table, id_column: &str, column: &str) -> Result<Vec<PropertyUpdate>> {
    let id_col = table.column(id_column)?;
    let value_col = table.column(column)?;

    let updates: Vec<PropertyUpdate> = (0..table.len())
        .filter_map(|row| {
            let id = table.cell(row, id_col)?;
            let value = table.cell(row, value_col)?;
            let mut properties = BTreeMap::new();
            properties.insert(column.to_string(), normalize_value(value));
            Some(PropertyUpdate {
                id: id.to_string(),
                properties,
            })
        })
        .collect();

    tracing::debug!(rows = table.len(), updates = updates.len(), column, "built property updates");
    Ok(updates)
}

/// Distinct labels across semicolon-joined values, first-seen order,
/// numbered from zero.
pub fn make_options<I, S>(values: I) -> Vec<PropertyOption>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut labels: Vec<String> = Vec::new();
    for value in values {
        for label in value.as_ref().split(';').filter(|l| !l.is_empty()) {
            if !labels.iter().any(|l| l == label) {
                labels.push(label.to_string());
            }
        }
    }
    labels
        .into_iter()
        .enumerate()
        .map(|(display_order, label)| PropertyOption {
            value: normalize_value(&label),
            label,
            display_order,
            hidden: false,
        })
        .collect()
}

/// Options for every value of `column` in the table.
pub fn make_options_from_table(table: &Table, column: &str) -> Result<Vec<PropertyOption>> {
    let col = table.column(column)?;
    Ok(make_options((0..table.len()).filter_map(|row| table.cell(row, col))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_spaces_and_case() {
        assert_eq!(normalize_value(";Financial Services;FinTech"), ";financial_services;fintech");
    }

    #[test]
    fn property_updates_skip_missing() {
        let table = Table::from_json_rows(&[
            json!({"Record ID": "1", "pf_inds": ";Mental Health"}),
            json!({"Record ID": "2", "pf_inds": null}),
        ]);
        let updates = make_property_updates(&table, "Record ID", "pf_inds").unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, "1");
        assert_eq!(updates[0].properties["pf_inds"], ";mental_health");
    }

    #[test]
    fn options_dedupe_and_order() {
        let options = make_options([";SaaS;FinTech", ";FinTech;Real Estate", ""]);
        let labels: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["SaaS", "FinTech", "Real Estate"]);
        assert_eq!(options[2].value, "real_estate");
        assert_eq!(options[2].display_order, 2);
        assert!(options.iter().all(|o| !o.hidden));
    }

    #[test]
    fn option_json_shape() {
        let options = make_options([";Real Estate"]);
        let v = serde_json::to_value(&options[0]).unwrap();
        assert_eq!(
            v,
            json!({"label": "Real Estate", "value": "real_estate", "displayOrder": 0, "hidden": false})
        );
    }

    #[test]
    fn definition_json_shape() {
        let def = PropertyDefinition::checkbox("pf_inds", "Portfolio Industries", "companyinformation", vec![]);
        let v = serde_json::to_value(&def).unwrap();
        assert_eq!(v["type"], "enumeration");
        assert_eq!(v["fieldType"], "checkbox");
        assert_eq!(v["groupName"], "companyinformation");
        assert_eq!(v["displayOrder"], 1);
        assert_eq!(v["formField"], false);
        assert_eq!(v["modificationMetadata"]["readOnlyValue"], false);
        assert_eq!(v["searchableInGlobalSearch"], true);
        assert_eq!(v["hasUniqueValue"], false);
    }

    #[test]
    fn definition_settings_map_to_crm_fields() {
        let settings = PropertySettings {
            field_type: "select".into(),
            group_name: "contactinformation".into(),
            display_order: 4,
            form_required: true,
            read_only: true,
            searchable: false,
            ..PropertySettings::default()
        };
        let def = PropertyDefinition::new("tx_angel_tags", "Preferred Tags", make_options([";B2B"]), &settings);
        let v = serde_json::to_value(&def).unwrap();
        assert_eq!(v["type"], "enumeration");
        assert_eq!(v["fieldType"], "select");
        assert_eq!(v["groupName"], "contactinformation");
        assert_eq!(v["displayOrder"], 4);
        assert_eq!(v["formField"], true);
        assert_eq!(v["modificationMetadata"]["readOnlyValue"], true);
        assert_eq!(v["searchableInGlobalSearch"], false);
        assert_eq!(v["hidden"], false);
        assert_eq!(v["hasUniqueValue"], false);
        assert_eq!(v["options"][0]["value"], "b2b");
    }
}
