//! Error types for callscope-core

use thiserror::Error;

/// Main error type for the callscope-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The call data source failed or rejected the query
    #[error("data source error: {0}")]
    Source(String),

    /// Malformed analytics request (bad dates, unknown category, ...)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias for callscope-core
pub type Result<T> = std::result::Result<T, Error>;
