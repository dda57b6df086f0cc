//! Error types for tempora-core

use thiserror::Error;

/// Main error type for the tempora-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error (schema setup, writes)
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The event store could not serve a query.
    ///
    /// Fatal for the aggregation that issued it; nothing at this layer retries.
    #[error("event store unavailable: {0}")]
    StoreUnavailable(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Calendar request that does not name a real period
    #[error("invalid time window: {0}")]
    InvalidWindow(String),
}

/// Result type alias for tempora-core
pub type Result<T> = std::result::Result<T, Error>;
