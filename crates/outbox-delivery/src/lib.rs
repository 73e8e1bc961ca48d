//! Delivery client seam for the outbox engine.
//!
//! This crate provides:
//! - `DeliveryClient`: the per-item outbound call trait the orchestrator
//!   drains through
//! - `HttpDeliveryClient`: reqwest-based implementation with typed wire
//!   payloads
//!
//! Clients make exactly one attempt per call. Whether and when an item is
//! retried is decided by the orchestrator across drain cycles.

mod error;
mod http;
mod traits;

pub use error::{DeliveryError, DeliveryResult};
pub use http::{DeliveryConfig, HttpDeliveryClient};
pub use traits::DeliveryClient;
