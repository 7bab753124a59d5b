//! Storage error types.

use thiserror::Error;

/// Errors that can occur while persisting or restoring workout data.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON encoding or decoding error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be turned back into an entity.
    #[error("Corrupt {entity}: {detail}")]
    Corrupt {
        entity: &'static str,
        detail: String,
    },

    /// No storage backend could be initialised.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Creates a corrupt-data error.
    pub fn corrupt(entity: &'static str, detail: impl Into<String>) -> Self {
        Self::Corrupt {
            entity,
            detail: detail.into(),
        }
    }
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
