//! SQLite-backed partitioned outbox store.
//!
//! This crate provides:
//! - `OutboxStore`: durable partitioned queue with atomic add/remove
//! - Model types for queued items and their tagged payloads
//! - Versioned migrations
//!
//! An item is either *pending* (row present) or *delivered* (row removed);
//! there is no persisted in-flight state. Removal happens only after the
//! orchestrator confirms a successful delivery.

mod error;
mod migrations;
mod models;
mod store;

pub use error::{StoreError, StoreResult};
pub use migrations::run_migrations;
pub use models::{
    AudioMetadata, DraftPayload, HttpMethod, ItemStatus, Partition, Payload,
    PendingCounts, PendingRequestPayload, QueueItem, VoiceRecordingPayload,
};
pub use store::OutboxStore;
