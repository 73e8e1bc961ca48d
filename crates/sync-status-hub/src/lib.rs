//! Publish/subscribe channel for sync progress.
//!
//! `StatusHub` keeps an explicit registry of listener callbacks keyed by
//! [`SubscriptionId`]. The orchestrator publishes a [`SyncStatus`] snapshot
//! once when a drain cycle starts and once when it ends; every registered
//! listener receives every publication.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Snapshot of sync progress, published at cycle boundaries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Whether a drain cycle is currently running.
    pub is_syncing: bool,
    /// When the last cycle finished, if any.
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Total pending items across all partitions.
    pub pending_count: usize,
    /// Human-readable errors from the last cycle.
    pub errors: Vec<String>,
}

/// Handle returned by [`StatusHub::subscribe`]; pass it back to
/// [`StatusHub::unsubscribe`] to stop receiving publications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&SyncStatus) + Send + Sync>;

/// Listener registry with fan-out publication.
#[derive(Default)]
pub struct StatusHub {
    listeners: Mutex<HashMap<u64, Listener>>,
    next_id: AtomicU64,
}

impl StatusHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Every subsequent publication is delivered to it
    /// until the returned id is unsubscribed.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&SyncStatus) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .expect("lock poisoned")
            .insert(id, Arc::new(listener));
        SubscriptionId(id)
    }

    /// Remove a listener. Returns false if the id was already gone.
    /// Other listeners are unaffected.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners
            .lock()
            .expect("lock poisoned")
            .remove(&id.0)
            .is_some()
    }

    /// Deliver a status snapshot to every registered listener.
    pub fn publish(&self, status: &SyncStatus) {
        // Snapshot the registry first so a listener may subscribe or
        // unsubscribe from inside its callback.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .expect("lock poisoned")
            .values()
            .cloned()
            .collect();

        debug!(
            is_syncing = status.is_syncing,
            pending = status.pending_count,
            errors = status.errors.len(),
            listeners = listeners.len(),
            "Publishing sync status"
        );
        for listener in &listeners {
            listener(status);
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().expect("lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn status_with_pending(pending_count: usize) -> SyncStatus {
        SyncStatus {
            is_syncing: false,
            last_sync_time: Some(Utc::now()),
            pending_count,
            errors: vec![],
        }
    }

    #[test]
    fn every_listener_receives_every_publication() {
        let hub = StatusHub::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        {
            let first = first.clone();
            hub.subscribe(move |_| {
                first.fetch_add(1, Ordering::SeqCst);
            });
        }
        {
            let second = second.clone();
            hub.subscribe(move |_| {
                second.fetch_add(1, Ordering::SeqCst);
            });
        }

        hub.publish(&status_with_pending(3));
        hub.publish(&status_with_pending(0));

        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribing_one_does_not_affect_others() {
        let hub = StatusHub::new();
        let kept = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicUsize::new(0));

        let kept_id = {
            let kept = kept.clone();
            hub.subscribe(move |_| {
                kept.fetch_add(1, Ordering::SeqCst);
            })
        };
        let dropped_id = {
            let dropped = dropped.clone();
            hub.subscribe(move |_| {
                dropped.fetch_add(1, Ordering::SeqCst);
            })
        };

        assert!(hub.unsubscribe(dropped_id));
        hub.publish(&status_with_pending(1));

        assert_eq!(kept.load(Ordering::SeqCst), 1);
        assert_eq!(dropped.load(Ordering::SeqCst), 0);

        // Double unsubscribe is a no-op
        assert!(!hub.unsubscribe(dropped_id));
        assert!(hub.unsubscribe(kept_id));
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn listener_may_unsubscribe_itself_during_publication() {
        let hub = Arc::new(StatusHub::new());
        let own_id = Arc::new(Mutex::new(None::<SubscriptionId>));
        let calls = Arc::new(AtomicUsize::new(0));

        let id = {
            let registry = hub.clone();
            let own_id = own_id.clone();
            let calls = calls.clone();
            hub.subscribe(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Some(id) = *own_id.lock().unwrap() {
                    registry.unsubscribe(id);
                }
            })
        };
        *own_id.lock().unwrap() = Some(id);

        hub.publish(&status_with_pending(0));
        hub.publish(&status_with_pending(0));

        // First publication reached it, then it was gone
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn listeners_observe_the_published_snapshot() {
        let hub = StatusHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        {
            let seen = seen.clone();
            hub.subscribe(move |status: &SyncStatus| {
                seen.lock().unwrap().push(status.clone());
            });
        }

        hub.publish(&SyncStatus {
            is_syncing: true,
            last_sync_time: None,
            pending_count: 5,
            errors: vec![],
        });
        hub.publish(&SyncStatus {
            is_syncing: false,
            last_sync_time: Some(Utc::now()),
            pending_count: 1,
            errors: vec!["drafts item d-1: HTTP 500".to_string()],
        });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].is_syncing);
        assert_eq!(seen[1].pending_count, 1);
        assert_eq!(seen[1].errors.len(), 1);
    }
}
