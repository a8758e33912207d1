//! Error types shared by every stage of the pipeline.
//!
//! Only structural problems are errors: a missing file or column, a bad
//! taxonomy document, a rejected CRM write. Individual malformed rows are
//! skipped or passed through by the transforms themselves.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Input file does not exist.
    #[error("Input file not found: {path}")]
    MissingFile { path: String },

    /// A column the stage needs is absent from the table.
    #[error("Missing column '{column}'")]
    MissingColumn { column: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Taxonomy or rule table could not be read or parsed.
    #[error("Taxonomy error: {0}")]
    Taxonomy(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The CRM rejected a call. Never retried.
    #[error("CRM write to {kind} failed (status {status}): {message}")]
    ExternalWrite {
        kind: String,
        status: u16,
        message: String,
    },
}

impl Error {
    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }
}
