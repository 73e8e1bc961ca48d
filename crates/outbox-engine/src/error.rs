//! Engine error types.

use outbox_store::StoreError;
use thiserror::Error;

/// Engine error type.
///
/// Storage failures are loud and local to the failing call so the producer
/// can fall back (e.g. attempt a direct call instead of queueing). Delivery
/// failures never appear here; they are recovered inside the drain loop and
/// surfaced through the status hub.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed item rejected before it enters the store
    #[error("Validation error: {0}")]
    Validation(String),

    /// Durable store failure
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Result type alias using EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
