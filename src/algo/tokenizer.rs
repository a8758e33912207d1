use regex::Regex;

use crate::algo::table::Table;
use crate::error::{Error, Result};

/// One (entity, token) pair produced by exploding a delimited field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplodedRow {
    /// Index of the source row in the input table.
    pub row: usize,
    pub id: String,
    pub token: String,
    /// The original, unsplit field text.
    pub reference: String,
}

/// Split pattern for delimited fields. Surrounding whitespace is absorbed.
#[derive(Debug, Clone)]
pub struct Delimiter {
    pattern: Regex,
}

impl Delimiter {
    /// Build from a regex pattern such as `","` or `"[,;]"`.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(&format!(r"\s*(?:{pattern})\s*"))
            .map_err(|e| Error::InvalidInput(format!("bad delimiter pattern '{pattern}': {e}")))?;
        Ok(Self { pattern })
    }

    pub fn comma() -> Self {
        Self {
            pattern: Regex::new(r"\s*(?:,)\s*").expect("static pattern"),
        }
    }

    pub fn split<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pattern.split(text)
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Self::comma()
    }
}

/// Normalize one phrase: `&` becomes `and`, then lowercase and trim.
pub fn normalize_token(phrase: &str) -> String {
    phrase.replace('&', "and").to_lowercase().trim().to_string()
}

/// Split a raw field into normalized tokens. Empty phrases are kept.
pub fn tokenize(text: &str, delimiter: &Delimiter) -> Vec<String> {
    delimiter.split(text).map(normalize_token).collect()
}

/// Explode `field` into one row per token. Rows with a missing field emit
/// nothing; rows with a missing id are skipped.
pub fn explode(
    table: &Table,
    id_column: &str,
    field: &str,
    delimiter: &Delimiter,
) -> Result<Vec<ExplodedRow>> {
    let id_col = table.column(id_column)?;
    let field_col = table.column(field)?;

    let mut out = Vec::new();
    let mut skipped = 0usize;
    for row in 0..table.len() {
        let Some(text) = table.cell(row, field_col) else {
            continue;
        };
        let Some(id) = table.cell(row, id_col) else {
            skipped += 1;
            continue;
        };
        for token in tokenize(text, delimiter) {
            out.push(ExplodedRow {
                row,
                id: id.to_string(),
                token,
                reference: text.to_string(),
            });
        }
    }

    if skipped > 0 {
        tracing::warn!(skipped, column = id_column, "rows without an id were skipped");
    }
    tracing::debug!(rows = table.len(), tokens = out.len(), field, "exploded field");
    Ok(out)
}
