//! Store error types.

use crate::Partition;
use thiserror::Error;

/// Store error type.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// An item with the same id already exists in the partition
    #[error("Duplicate item id {id} in partition {partition}")]
    DuplicateId { partition: Partition, id: String },

    /// Persisted payload failed schema validation on read
    #[error("Invalid payload for item {id}: {source}")]
    InvalidPayload {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type alias using StoreError.
pub type StoreResult<T> = Result<T, StoreError>;
