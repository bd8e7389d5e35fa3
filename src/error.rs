use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a dataset or reading CLI parameters.
///
/// Aggregations never fail: empty input and unparseable cells produce neutral
/// results instead of errors.
#[derive(Error, Debug)]
pub enum ArError {
    /// The dataset file could not be opened or read.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV export is structurally broken (bad header row, not UTF-8).
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A JSONL line was not a valid JSON object.
    #[error("Invalid JSON on line {line}: {source}")]
    JsonLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// The file extension is not one the reader understands.
    #[error("Unsupported dataset format: {0}")]
    UnsupportedFormat(String),

    /// A date parameter did not match any accepted format.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ArError>;
