use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde_json::{Map, Value};

use crate::algo::subcategory::join_categories;
use crate::error::{Error, Result};

/// In-memory table of optional string cells.
///
/// Empty CSV cells and JSON nulls are both stored as `None`, matching how
/// scraped exports mark a missing value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Read a headed CSV file.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::MissingFile {
                path: path.display().to_string(),
            });
        }
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;
        Self::from_csv(reader)
    }

    /// Read headed CSV from any reader (stdin, in-memory bytes).
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        Self::from_csv(reader)
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let width = headers.len();
        let mut table = Self::new(headers);
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<Option<String>> = record
                .iter()
                .take(width)
                .map(|cell| {
                    if cell.is_empty() {
                        None
                    } else {
                        Some(cell.to_string())
                    }
                })
                .collect();
            row.resize(width, None);
            table.rows.push(row);
        }
        Ok(table)
    }

    /// Build a table from JSON records. Headers are the union of keys in
    /// first-seen order; numbers and booleans are stringified.
    pub fn from_json_rows(rows: &[Value]) -> Self {
        let mut headers: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for row in rows {
            if let Value::Object(map) = row {
                for key in map.keys() {
                    if !positions.contains_key(key) {
                        positions.insert(key.clone(), headers.len());
                        headers.push(key.clone());
                    }
                }
            }
        }

        let mut table = Self::new(headers);
        for row in rows {
            let mut cells = vec![None; table.headers.len()];
            if let Value::Object(map) = row {
                for (key, value) in map {
                    cells[positions[key]] = cell_from_json(value);
                }
            }
            table.rows.push(cells);
        }
        table
    }

    /// Convert back to JSON records; missing cells become `null`.
    pub fn to_json_rows(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut obj = Map::new();
                for (header, cell) in self.headers.iter().zip(row) {
                    let value = match cell {
                        Some(s) => Value::String(s.clone()),
                        None => Value::Null,
                    };
                    obj.insert(header.clone(), value);
                }
                Value::Object(obj)
            })
            .collect()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a named column, or `MissingColumn`.
    pub fn column(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::missing_column(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|c| c.as_deref())
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<String>]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    /// Append a row; short rows are padded with missing cells.
    pub fn push_row(&mut self, mut row: Vec<Option<String>>) {
        row.resize(self.headers.len(), None);
        self.rows.push(row);
    }

    /// Keep only rows for which `keep` returns true.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Option<String>]) -> bool,
    {
        self.rows.retain(|r| keep(r));
    }

    /// Left join on one or more key columns. For each left row the first
    /// right row with equal keys supplies the right-hand columns; unmatched
    /// rows get missing cells. Right key columns are not repeated, and right
    /// columns whose name already exists on the left are suffixed `_right`.
    pub fn left_join(&self, right: &Table, left_on: &[&str], right_on: &[&str]) -> Result<Table> {
        if left_on.len() != right_on.len() || left_on.is_empty() {
            return Err(Error::InvalidInput(format!(
                "join needs matching key lists, got {} left and {} right",
                left_on.len(),
                right_on.len()
            )));
        }
        let left_keys: Vec<usize> = left_on
            .iter()
            .map(|c| self.column(c))
            .collect::<Result<_>>()?;
        let right_keys: Vec<usize> = right_on
            .iter()
            .map(|c| right.column(c))
            .collect::<Result<_>>()?;

        let mut index: HashMap<Vec<&str>, usize> = HashMap::new();
        for (i, row) in right.rows.iter().enumerate() {
            let key: Option<Vec<&str>> = right_keys.iter().map(|&k| row[k].as_deref()).collect();
            if let Some(key) = key {
                index.entry(key).or_insert(i);
            }
        }

        let carried: Vec<usize> = (0..right.headers.len())
            .filter(|i| !right_keys.contains(i))
            .collect();
        let mut headers = self.headers.clone();
        for &c in &carried {
            let name = &right.headers[c];
            if self.has_column(name) {
                headers.push(format!("{name}_right"));
            } else {
                headers.push(name.clone());
            }
        }

        let mut joined = Table::new(headers);
        for row in &self.rows {
            let key: Option<Vec<&str>> = left_keys.iter().map(|&k| row[k].as_deref()).collect();
            let matched = key.and_then(|k| index.get(&k).copied());
            let mut out = row.clone();
            for &c in &carried {
                out.push(matched.and_then(|m| right.rows[m][c].clone()));
            }
            joined.rows.push(out);
        }
        Ok(joined)
    }
}

/// Lists of labels become a leading-semicolon string, the same shape the
/// pipeline writes for multi-valued columns.
fn cell_from_json(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let labels: Vec<String> = items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .filter(|s| !s.is_empty())
                .collect();
            if labels.is_empty() {
                None
            } else {
                Some(join_categories(&labels))
            }
        }
        other => Some(other.to_string()),
    }
}
