//! Funding-stage normalization for investor rollups.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::algo::subcategory::join_categories;
use crate::algo::table::Table;
use crate::error::Result;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%b %d, %Y", "%B %d, %Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Default cutoff: only rounds after the end of 2019 count.
pub fn default_since() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 12, 31).expect("valid date")
}

/// Parse the date formats seen in scraped round listings.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    parse_timestamp(raw).map(|ts| ts.date())
}

/// Like [`parse_date`] but keeps the time of day; bare dates are midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        .map(|d| d.and_time(NaiveTime::default()))
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        })
}

/// Normalize a raw round label.
///
/// `"Seed Round from Acme Ventures"` → `"Seed Round"`; labels mentioning
/// "unknown" are dropped; anything else passes through unchanged.
pub fn normalize_stage(raw: &str) -> Option<String> {
    let lower = raw.to_lowercase();
    if lower.contains("unknown") {
        return None;
    }
    for marker in ["from", "discover"] {
        if let Some(pos) = lower.find(marker) {
            return Some(title_case(lower[..pos].trim()));
        }
    }
    Some(raw.to_string())
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Stages an investor participated in after a cutoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvestorStages {
    pub id: String,
    pub stages: Vec<String>,
}

impl InvestorStages {
    pub fn joined(&self) -> String {
        join_categories(&self.stages)
    }
}

/// Group round rows by investor id, keeping rounds stamped strictly after
/// midnight on `since`. Rows with a missing or unparseable date are skipped. Investors
/// whose rounds all normalize away are omitted.
pub fn collect_stages(
    table: &Table,
    id_column: &str,
    stage_column: &str,
    date_column: &str,
    since: NaiveDate,
) -> Result<Vec<InvestorStages>> {
    let id_col = table.column(id_column)?;
    let stage_col = table.column(stage_column)?;
    let date_col = table.column(date_column)?;

    let cutoff = since.and_time(NaiveTime::default());
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<InvestorStages> = Vec::new();
    let mut undated = 0usize;

    for row in 0..table.len() {
        let Some(id) = table.cell(row, id_col) else {
            continue;
        };
        let Some(stamp) = table.cell(row, date_col).and_then(parse_timestamp) else {
            undated += 1;
            continue;
        };
        if stamp <= cutoff {
            continue;
        }
        let Some(stage) = table.cell(row, stage_col).and_then(normalize_stage) else {
            continue;
        };
        let pos = *positions.entry(id).or_insert_with(|| {
            out.push(InvestorStages {
                id: id.to_string(),
                stages: Vec::new(),
            });
            out.len() - 1
        });
        if !out[pos].stages.contains(&stage) {
            out[pos].stages.push(stage);
        }
    }

    if undated > 0 {
        tracing::warn!(undated, column = date_column, "rounds without a usable date were skipped");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_from_and_discover() {
        assert_eq!(
            normalize_stage("Seed Round from Acme Ventures").as_deref(),
            Some("Seed Round")
        );
        assert_eq!(
            normalize_stage("series a - discover more").as_deref(),
            Some("Series A -")
        );
        assert_eq!(normalize_stage("Venture Round - Unknown"), None);
        assert_eq!(normalize_stage("Series B").as_deref(), Some("Series B"));
    }

    #[test]
    fn parse_common_formats() {
        let d = NaiveDate::from_ymd_opt(2021, 3, 5).unwrap();
        assert_eq!(parse_date("2021-03-05"), Some(d));
        assert_eq!(parse_date("03/05/2021"), Some(d));
        assert_eq!(parse_date("Mar 5, 2021"), Some(d));
        assert_eq!(parse_date("2021-03-05 10:00:00"), Some(d));
        assert_eq!(parse_date("soon"), None);
    }

    #[test]
    fn collect_filters_by_date() {
        let table = Table::from_json_rows(&[
            json!({"id": "1", "stage": "Seed Round from X", "date": "2020-01-10"}),
            json!({"id": "1", "stage": "Seed Round from Y", "date": "2021-06-01"}),
            json!({"id": "1", "stage": "Series A", "date": "2019-05-01"}),
            json!({"id": "2", "stage": "Series A", "date": "not a date"}),
            json!({"id": "3", "stage": "Unknown Round", "date": "2022-01-01"}),
        ]);
        let stages = collect_stages(&table, "id", "stage", "date", default_since()).unwrap();
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].stages, vec!["Seed Round"]);
        assert_eq!(stages[0].joined(), ";Seed Round");
    }

    #[test]
    fn same_day_rounds_after_midnight_count() {
        let table = Table::from_json_rows(&[
            json!({"id": "1", "stage": "Seed Round from X", "date": "2019-12-31 10:00:00"}),
            json!({"id": "1", "stage": "Series A from Y", "date": "2019-12-31"}),
            json!({"id": "1", "stage": "Series B from Z", "date": "2019-12-31T00:00:00"}),
        ]);
        let stages = collect_stages(&table, "id", "stage", "date", default_since()).unwrap();
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].stages, vec!["Seed Round"]);
    }
}
