//! Network reachability state for the outbox engine.
//!
//! `ConnectivityMonitor` holds the current online/offline state behind a
//! `tokio::sync::watch` channel. Platform code feeds raw reachability
//! signals in via [`ConnectivityMonitor::set_online`]; consumers either
//! query [`is_online`](ConnectivityMonitor::is_online) or subscribe with
//! [`watch`](ConnectivityMonitor::watch).
//!
//! Transitions are edge-deduplicated: repeated signals with the same value
//! produce no notification, so rapid flapping yields exactly one
//! notification per edge. Each `watch()` receiver is independent, which
//! makes re-subscription naturally idempotent.

use tokio::sync::watch;
use tracing::debug;

/// Observes network reachability transitions and current state.
pub struct ConnectivityMonitor {
    state: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Create a monitor with the given initial state.
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(initially_online);
        Self { state }
    }

    /// Current reachability state.
    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// Feed a reachability signal.
    ///
    /// Returns true if this signal was an actual edge (the state changed and
    /// subscribers were notified), false if it repeated the current state.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            debug!(online, "Connectivity transition");
        }
        changed
    }

    /// Subscribe to transitions.
    ///
    /// The receiver yields one change per edge; flapping between signals is
    /// already collapsed by the sender.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Optional platform hook: "wake me when connectivity returns even if the
/// app is suspended".
///
/// Implementations report whether the platform supports the registration;
/// the default says no, and the engine works the same either way.
pub trait WakeRegistration: Send + Sync {
    /// Attempt to register for a background connectivity wake.
    ///
    /// Returns false when the platform has no such facility.
    fn register_connectivity_wake(&self) -> bool {
        false
    }
}
