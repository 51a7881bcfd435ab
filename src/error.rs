// ⚠️ Error taxonomy for the reconciliation library
// Every failure is scoped to the call that triggered it; malformed rows never reach here.

use thiserror::Error;

/// Library-wide error type
#[derive(Error, Debug)]
pub enum ReconError {
    /// A source file could not be tabularized
    #[error("Failed to parse {name}: {source}")]
    Parse { name: String, source: csv::Error },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The local-ledger endpoint answered with a non-success status
    #[error("Local data request failed with status {status}: {message}")]
    Fetch { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, ReconError>;
