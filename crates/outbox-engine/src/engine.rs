//! Sync orchestrator and public outbox API.

use crate::config::{item_due, EngineConfig};
use crate::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use connectivity_monitor::{ConnectivityMonitor, WakeRegistration};
use outbox_delivery::{DeliveryClient, DeliveryResult};
use outbox_store::{
    AudioMetadata, DraftPayload, HttpMethod, OutboxStore, Partition, Payload, PendingCounts,
    PendingRequestPayload, QueueItem, VoiceRecordingPayload,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use sync_status_hub::{StatusHub, SubscriptionId, SyncStatus};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// Offline outbox engine.
///
/// Producers enqueue items through the public API without knowing about
/// network state; the engine durably retains them and drains them against
/// the delivery client once connectivity allows, under a single-flight
/// discipline.
///
/// The handle is cheap to clone; clones share one engine.
///
/// # Lifecycle
///
/// 1. Construct with [`OutboxEngine::new`] (all dependencies injected)
/// 2. Call [`start`](Self::start) to follow connectivity transitions
/// 3. Enqueue items; observe progress via [`subscribe`](Self::subscribe)
/// 4. [`stop`](Self::stop) prevents future cycles; an in-flight cycle
///    always runs to completion
#[derive(Clone)]
pub struct OutboxEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    store: Arc<OutboxStore>,
    connectivity: Arc<ConnectivityMonitor>,
    client: Arc<dyn DeliveryClient>,
    hub: Arc<StatusHub>,
    config: EngineConfig,
    wake: Mutex<Option<Arc<dyn WakeRegistration>>>,
    /// Single-flight guard; set synchronously before the first suspension
    /// point of a cycle.
    syncing: AtomicBool,
    last_sync_time: Mutex<Option<DateTime<Utc>>>,
    lifecycle: Mutex<Option<JoinHandle<()>>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl OutboxEngine {
    /// Create a new engine with injected dependencies.
    pub fn new(
        store: Arc<OutboxStore>,
        connectivity: Arc<ConnectivityMonitor>,
        client: Arc<dyn DeliveryClient>,
        hub: Arc<StatusHub>,
        config: EngineConfig,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store,
                connectivity,
                client,
                hub,
                config,
                wake: Mutex::new(None),
                syncing: AtomicBool::new(false),
                last_sync_time: Mutex::new(None),
                lifecycle: Mutex::new(None),
                ticker: Mutex::new(None),
            }),
        }
    }

    /// Attach a platform background-wake hook. Its absence (or an
    /// unsupported platform) changes nothing.
    pub fn set_wake_registration(&self, wake: Arc<dyn WakeRegistration>) {
        *self.inner.wake.lock().expect("lock poisoned") = Some(wake);
    }

    /// Start the connectivity-driven lifecycle.
    ///
    /// Begins periodic draining if already online, and follows online/offline
    /// transitions from then on. Calling start twice is a logged no-op.
    pub fn start(&self) {
        let mut lifecycle = self.inner.lifecycle.lock().expect("lock poisoned");
        if lifecycle.is_some() {
            warn!("Engine already started");
            return;
        }

        if let Some(wake) = self.inner.wake.lock().expect("lock poisoned").as_ref() {
            let registered = wake.register_connectivity_wake();
            debug!(registered, "Background wake registration");
        }

        let engine = self.clone();
        *lifecycle = Some(tokio::spawn(async move {
            let mut transitions = engine.inner.connectivity.watch();

            if *transitions.borrow_and_update() {
                engine.start_ticker();
            }

            while transitions.changed().await.is_ok() {
                let online = *transitions.borrow_and_update();
                if online {
                    info!("Came online, starting sync");
                    let cycle = engine.clone();
                    tokio::spawn(async move { cycle.sync_now().await });
                    engine.start_ticker();
                } else {
                    info!("Went offline, pausing sync");
                    engine.stop_ticker();
                }
            }
        }));
    }

    /// Stop the lifecycle and the periodic timer.
    ///
    /// Only prevents the next cycle from starting; a cycle already in flight
    /// runs to completion.
    pub fn stop(&self) {
        self.stop_ticker();
        if let Some(handle) = self.inner.lifecycle.lock().expect("lock poisoned").take() {
            handle.abort();
        }
    }

    fn start_ticker(&self) {
        let mut ticker = self.inner.ticker.lock().expect("lock poisoned");
        if ticker.is_some() {
            return;
        }

        let engine = self.clone();
        *ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(engine.inner.config.sync_interval);
            // The first tick fires immediately; the online transition already
            // triggered a sync, so consume it.
            interval.tick().await;
            loop {
                interval.tick().await;
                // Each cycle gets its own task: aborting the ticker on an
                // offline edge must not abort a cycle in flight.
                let cycle = engine.clone();
                tokio::spawn(async move { cycle.sync_now().await });
            }
        }));
    }

    fn stop_ticker(&self) {
        if let Some(handle) = self.inner.ticker.lock().expect("lock poisoned").take() {
            handle.abort();
        }
    }

    // ==========================================
    // Producer API
    // ==========================================

    /// Queue a text draft for delivery. Returns the item id.
    pub fn enqueue_draft(
        &self,
        content: impl Into<String>,
        metadata: BTreeMap<String, String>,
    ) -> EngineResult<String> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(EngineError::Validation("draft content is empty".into()));
        }

        self.add_item(Payload::Draft(DraftPayload { content, metadata }))
    }

    /// Queue a voice recording for delivery. Returns the item id.
    pub fn enqueue_voice_recording(
        &self,
        audio: Vec<u8>,
        transcription: Option<String>,
        metadata: AudioMetadata,
    ) -> EngineResult<String> {
        if audio.is_empty() {
            return Err(EngineError::Validation("audio blob is empty".into()));
        }

        self.add_item(Payload::VoiceRecording(VoiceRecordingPayload {
            audio,
            transcription,
            metadata,
        }))
    }

    /// Queue an arbitrary API call for later replay. Returns the item id.
    pub fn enqueue_request(
        &self,
        url: impl Into<String>,
        method: HttpMethod,
        body: Option<String>,
        headers: BTreeMap<String, String>,
    ) -> EngineResult<String> {
        let url = url.into();
        let parsed = Url::parse(&url)
            .map_err(|e| EngineError::Validation(format!("invalid url {}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(EngineError::Validation(format!(
                "unsupported url scheme: {}",
                parsed.scheme()
            )));
        }

        self.add_item(Payload::PendingRequest(PendingRequestPayload {
            url,
            method,
            body,
            headers,
        }))
    }

    fn add_item(&self, payload: Payload) -> EngineResult<String> {
        let item = QueueItem::new(payload);
        let id = item.id.clone();
        // Store failures propagate to the producer so it can fall back to a
        // direct call instead of queueing.
        self.inner.store.add(&item)?;
        debug!(partition = %item.partition(), id = %id, "Item queued");
        Ok(id)
    }

    /// Pending counts per partition, for UI badges.
    pub fn pending_counts(&self) -> EngineResult<PendingCounts> {
        Ok(self.inner.store.counts()?)
    }

    /// Purge every item in a partition (explicit user-initiated clear).
    /// Returns the number removed.
    pub fn clear(&self, partition: Partition) -> EngineResult<usize> {
        Ok(self.inner.store.clear(partition)?)
    }

    /// Dead-lettered items in a partition, for inspection.
    pub fn dead_letters(&self, partition: Partition) -> EngineResult<Vec<QueueItem>> {
        Ok(self.inner.store.dead_letters(partition)?)
    }

    /// Subscribe to sync status publications.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&SyncStatus) + Send + Sync + 'static,
    {
        self.inner.hub.subscribe(listener)
    }

    /// Remove a status listener.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.hub.unsubscribe(id)
    }

    // ==========================================
    // Drain cycle
    // ==========================================

    /// Run one drain cycle.
    ///
    /// No-op while offline, and no-op if a cycle is already running: the
    /// guard is taken synchronously before the first await, so a re-entrant
    /// call in the same task cannot race past it. Items enqueued after a
    /// partition's snapshot wait for the next invocation.
    pub async fn sync_now(&self) {
        let inner = &*self.inner;

        if !inner.connectivity.is_online() {
            debug!("Sync requested while offline, skipping");
            return;
        }

        if inner
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Sync already in progress, skipping");
            return;
        }
        let _guard = SyncGuard(&inner.syncing);

        inner.hub.publish(&SyncStatus {
            is_syncing: true,
            last_sync_time: *inner.last_sync_time.lock().expect("lock poisoned"),
            pending_count: self.pending_total(),
            errors: vec![],
        });

        let mut errors = Vec::new();
        for partition in Partition::ALL {
            self.drain_partition(partition, &mut errors).await;
        }

        let finished_at = Utc::now();
        *inner.last_sync_time.lock().expect("lock poisoned") = Some(finished_at);

        let pending = self.pending_total();
        info!(pending, errors = errors.len(), "Sync cycle finished");
        inner.hub.publish(&SyncStatus {
            is_syncing: false,
            last_sync_time: Some(finished_at),
            pending_count: pending,
            errors,
        });
    }

    /// Drain one partition's snapshot. One item's failure never prevents
    /// processing of the items after it.
    async fn drain_partition(&self, partition: Partition, errors: &mut Vec<String>) {
        let items = match self.inner.store.get_all(partition) {
            Ok(items) => items,
            Err(e) => {
                warn!(partition = %partition, error = %e, "Failed to read partition");
                errors.push(format!("{} read failed: {}", partition, e));
                return;
            }
        };

        let now = Utc::now();
        for item in items {
            if !item_due(&item, now, &self.inner.config) {
                debug!(partition = %partition, id = %item.id, "Item not due yet");
                continue;
            }

            match self.deliver(&item).await {
                Ok(()) => {
                    debug!(partition = %partition, id = %item.id, "Item delivered");
                    if let Err(e) = self.inner.store.remove(partition, &item.id) {
                        warn!(partition = %partition, id = %item.id, error = %e, "Failed to remove delivered item");
                        errors.push(format!("{} remove failed: {}", partition, e));
                    }
                }
                Err(e) => {
                    warn!(
                        partition = %partition,
                        id = %item.id,
                        retry_count = item.retry_count,
                        error = %e,
                        "Delivery failed"
                    );
                    errors.push(format!("{} item {}: {}", partition, item.id, e));
                    self.record_failure(partition, &item.id, &e.to_string());
                }
            }
        }
    }

    fn record_failure(&self, partition: Partition, id: &str, error: &str) {
        match self.inner.store.mark_failed(partition, id, error) {
            Ok(Some(retry_count)) => {
                if let Some(max) = self.inner.config.max_retries {
                    if retry_count > max {
                        match self.inner.store.mark_dead(partition, id) {
                            Ok(true) => {
                                info!(partition = %partition, id = %id, retry_count, "Item dead-lettered")
                            }
                            Ok(false) => {}
                            Err(e) => {
                                warn!(partition = %partition, id = %id, error = %e, "Failed to dead-letter item")
                            }
                        }
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(partition = %partition, id = %id, error = %e, "Failed to record delivery failure")
            }
        }
    }

    async fn deliver(&self, item: &QueueItem) -> DeliveryResult<()> {
        match &item.payload {
            Payload::Draft(p) => self.inner.client.deliver_draft(p).await,
            Payload::VoiceRecording(p) => self.inner.client.deliver_voice_recording(p).await,
            Payload::PendingRequest(p) => self.inner.client.deliver_request(p).await,
        }
    }

    fn pending_total(&self) -> usize {
        match self.inner.store.counts() {
            Ok(counts) => counts.total(),
            Err(e) => {
                warn!(error = %e, "Failed to compute pending counts");
                0
            }
        }
    }
}

/// Releases the single-flight flag on every exit path of a cycle.
struct SyncGuard<'a>(&'a AtomicBool);

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
