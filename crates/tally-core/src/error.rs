//! Error types for tally-core

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type alias using tally-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tally-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Key-value storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote record API error
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
