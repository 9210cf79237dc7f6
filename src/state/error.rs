use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the photo library database.
#[derive(Error, Debug)]
pub enum LibraryError {
    /// Failed to open or create the database file.
    #[error("Failed to open database at {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    /// Failed to create the data directory holding the database.
    #[error("Failed to create data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Database schema setup failed: {0}")]
    Schema(rusqlite::Error),

    /// A query or statement failed.
    #[error("Database query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Failed to encode metadata: {0}")]
    Encode(#[from] serde_json::Error),

    /// Another thread panicked while holding the connection.
    #[error("Database connection lock poisoned")]
    Poisoned,
}
