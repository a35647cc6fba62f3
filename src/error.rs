//! Error types for the coins explorer library

use thiserror::Error;

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, CoinsError>;

/// Main error type
///
/// Only stream-level and setup failures surface here. A bad date, a
/// non-numeric decimal or a malformed filter criterion never becomes an
/// error: the affected value is read as absent instead.
#[derive(Error, Debug)]
pub enum CoinsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Dataset '{dataset}' is missing required column '{column}'")]
    MissingColumn { dataset: String, column: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dataset error: {0}")]
    Dataset(String),
}

impl CoinsError {
    pub fn missing_column(dataset: impl Into<String>, column: impl Into<String>) -> Self {
        CoinsError::MissingColumn {
            dataset: dataset.into(),
            column: column.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        CoinsError::Config(msg.into())
    }

    pub fn dataset(msg: impl Into<String>) -> Self {
        CoinsError::Dataset(msg.into())
    }
}
