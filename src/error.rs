//! Error types for NutellaDB
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using NutellaError
pub type Result<T> = std::result::Result<T, NutellaError>;

/// Unified error type for NutellaDB operations
#[derive(Debug, Error)]
pub enum NutellaError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // B-tree Errors
    // -------------------------------------------------------------------------
    #[error("B-tree order must be at least 3, got {0}")]
    OrderTooSmall(usize),

    #[error("Corrupt node page: {0}")]
    NodeCorrupt(String),

    // -------------------------------------------------------------------------
    // Database Errors
    // -------------------------------------------------------------------------
    #[error("Collection '{0}' already exists")]
    CollectionExists(String),

    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),

    #[error("No database found at '{0}'")]
    DatabaseNotFound(String),

    // -------------------------------------------------------------------------
    // Object Store Errors
    // -------------------------------------------------------------------------
    #[error("Object {0} not found")]
    ObjectNotFound(String),

    #[error("Corrupt object: {0}")]
    CorruptObject(String),

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("No repository found at '{0}'")]
    RepositoryNotFound(String),

    #[error("Snapshot {0} not found")]
    SnapshotNotFound(String),

    #[error("Commit message cannot be empty")]
    EmptyCommitMessage,

    // -------------------------------------------------------------------------
    // Cache Errors
    // -------------------------------------------------------------------------
    #[error("Key '{key}' not found in collection '{collection}'")]
    KeyNotFound { collection: String, key: String },
}

impl From<serde_json::Error> for NutellaError {
    fn from(err: serde_json::Error) -> Self {
        NutellaError::Serialization(err.to_string())
    }
}
