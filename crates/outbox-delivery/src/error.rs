//! Delivery error types.

use thiserror::Error;

/// Delivery error type.
///
/// Recovered by the orchestrator on a per-item basis; never aborts a drain
/// cycle.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// Transport-level failure (connection, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the remote service
    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// Payload could not be serialized for the wire
    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Result type alias using DeliveryError.
pub type DeliveryResult<T> = Result<T, DeliveryError>;
