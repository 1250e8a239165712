//! Error types for the reporting pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("table `{table}` is missing required column `{column}`")]
    MissingColumn { table: String, column: String },

    #[error("table `{table}` does not match the union schema: expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        table: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("airline reference table lists code `{0}` more than once")]
    DuplicateAirlineCode(String),

    #[error("row {row}: trip date `{value}` is not a valid calendar date")]
    DateParse { row: usize, value: String },

    #[error("cannot open source `{path}`: {source}")]
    SourceOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read or write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("file access failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
