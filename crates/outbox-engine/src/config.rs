//! Engine configuration and retry policy.

use chrono::{DateTime, Utc};
use outbox_store::QueueItem;
use tokio::time::Duration;

/// Configuration for sync cadence and retry behavior.
///
/// # Fields
///
/// - `sync_interval`: periodic drain cadence while online (default: 30s)
/// - `backoff_base`: initial per-item retry delay (default: zero — failed
///   items are retried on every cycle)
/// - `backoff_max`: cap for exponential backoff growth (default: 300s)
/// - `max_retries`: dead-letter threshold; `None` retries forever
///
/// # Backoff Calculation
///
/// With a nonzero `backoff_base`, an item's retry delay follows
/// `base * 2^(retry_count - 1)` capped at `backoff_max`, measured from its
/// last attempt. With the default zero base every failed item is due on the
/// next cycle.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How often the periodic timer fires while online.
    pub sync_interval: Duration,
    /// Base duration for exponential backoff on retries. Zero disables
    /// backoff entirely.
    pub backoff_base: Duration,
    /// Maximum duration for backoff (caps exponential growth).
    pub backoff_max: Duration,
    /// Number of failed attempts after which an item is dead-lettered.
    /// `None` keeps retrying indefinitely.
    pub max_retries: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(30),
            backoff_base: Duration::ZERO,
            backoff_max: Duration::from_secs(300),
            max_retries: None,
        }
    }
}

/// Computes the exponential backoff duration for a given retry count.
pub(crate) fn compute_backoff(retry_count: u32, config: &EngineConfig) -> chrono::Duration {
    if retry_count == 0 || config.backoff_base.is_zero() {
        return chrono::Duration::zero();
    }

    let base_ms = config.backoff_base.as_millis() as u64;
    let max_ms = config.backoff_max.as_millis() as u64;
    let shift = retry_count.saturating_sub(1);
    let multiplier = 1u64.checked_shl(shift).unwrap_or(u64::MAX);
    let delay_ms = base_ms.saturating_mul(multiplier).min(max_ms);

    chrono::Duration::milliseconds(delay_ms as i64)
}

/// Whether an item is due for another delivery attempt.
///
/// Due if it has never been attempted, or if enough time has passed since
/// the last attempt for its retry count.
pub(crate) fn item_due(item: &QueueItem, now: DateTime<Utc>, config: &EngineConfig) -> bool {
    let Some(last_attempt) = item.last_attempt_at else {
        return true;
    };

    now >= last_attempt + compute_backoff(item.retry_count, config)
}
