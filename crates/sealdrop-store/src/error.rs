//! Error types for the store module.

use sealdrop_core::CoreError;
use thiserror::Error;

/// Errors that can occur during storage and key store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Key generation or encoding failed.
    #[error(transparent)]
    Key(#[from] CoreError),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock guarding backend state was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,

    /// A blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        StoreError::Task(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
