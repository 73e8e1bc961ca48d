//! Offline outbox engine.
//!
//! Reliable delivery of user-generated mutations (text drafts, voice
//! recordings, arbitrary API calls) produced while the client has no or
//! unreliable connectivity. Anything accepted locally is durably retained
//! and eventually delivered once connectivity returns; producing code never
//! needs to know about network state.
//!
//! # Architecture
//!
//! - [`outbox_store::OutboxStore`]: durable partitioned queue (SQLite)
//! - [`connectivity_monitor::ConnectivityMonitor`]: reachability state
//! - [`outbox_delivery::DeliveryClient`]: one outbound call per item
//! - [`sync_status_hub::StatusHub`]: progress publications for the UI
//! - [`OutboxEngine`]: drains the store against the client under a
//!   single-flight discipline, driven by connectivity transitions
//!
//! # Example
//!
//! ```ignore
//! let store = Arc::new(OutboxStore::open(&data_dir.join("outbox.db"))?);
//! let connectivity = Arc::new(ConnectivityMonitor::new(false));
//! let client = Arc::new(HttpDeliveryClient::new(DeliveryConfig::default())?);
//! let hub = Arc::new(StatusHub::new());
//!
//! let engine = OutboxEngine::new(
//!     store, connectivity.clone(), client, hub, EngineConfig::default(),
//! );
//! engine.start();
//!
//! // Producers stay network-agnostic:
//! let id = engine.enqueue_draft("dear diary", BTreeMap::new())?;
//!
//! // Platform reachability callbacks feed the monitor:
//! connectivity.set_online(true);
//! ```

mod config;
mod engine;
mod error;
mod logging;

pub use config::EngineConfig;
pub use engine::OutboxEngine;
pub use error::{EngineError, EngineResult};
pub use logging::init_logging;

// The seams producers and hosts wire together.
pub use connectivity_monitor::{ConnectivityMonitor, WakeRegistration};
pub use outbox_delivery::{DeliveryClient, DeliveryConfig, DeliveryError, HttpDeliveryClient};
pub use outbox_store::{
    AudioMetadata, DraftPayload, HttpMethod, OutboxStore, Partition, Payload, PendingCounts,
    PendingRequestPayload, QueueItem, VoiceRecordingPayload,
};
pub use sync_status_hub::{StatusHub, SubscriptionId, SyncStatus};
