//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A grant with this id or token hash already exists.
    #[error("duplicate grant: {0}")]
    Duplicate(String),

    /// A key pair is already enrolled for this grant.
    #[error("key pair already enrolled for grant {0}")]
    KeyPairExists(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Stored record failed domain validation.
    #[error("corrupt record: {0}")]
    Core(#[from] lifeline_core::CoreError),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// In-memory state lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,

    /// Blocking task failed to complete.
    #[error("background task failed: {0}")]
    Task(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
