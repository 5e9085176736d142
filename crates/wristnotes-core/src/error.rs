//! Error types for wristnotes-core

use thiserror::Error;

/// Result type alias using wristnotes-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in wristnotes-core storage and configuration
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid or unreadable settings
    #[error("Configuration error: {0}")]
    Config(String),
}
