//! Durable partitioned outbox store.
//!
//! Every operation is a single SQLite statement on a mutex-guarded
//! connection, so each add/remove is its own atomic transaction and a
//! partially written item is never observable.

use crate::{
    migrations, ItemStatus, Partition, Payload, PendingCounts, QueueItem, StoreError, StoreResult,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// SQLite-backed outbox store.
///
/// Shared between producers (enqueue) and the sync orchestrator (drain);
/// safe behind an `Arc`.
pub struct OutboxStore {
    conn: Mutex<Connection>,
}

impl OutboxStore {
    /// Open a store at the given path, running migrations if needed.
    ///
    /// Idempotent: creates the schema on first open, no-ops afterwards.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
        ",
        )?;
        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store for testing.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        // WAL mode doesn't apply to in-memory databases
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert one item into its partition.
    ///
    /// Fails with [`StoreError::DuplicateId`] if the (partition, id) pair
    /// already exists. The insert is fully visible or not at all.
    pub fn add(&self, item: &QueueItem) -> StoreResult<()> {
        let partition = item.partition();
        let payload_json = serde_json::to_string(&item.payload)
            .map_err(|source| StoreError::InvalidPayload {
                id: item.id.clone(),
                source,
            })?;
        let audio: Option<&[u8]> = match &item.payload {
            Payload::VoiceRecording(p) => Some(&p.audio),
            _ => None,
        };

        let conn = self.conn.lock().expect("lock poisoned");
        let result = conn.execute(
            "INSERT INTO outbox_items
                (partition, id, created_at, retry_count, last_error, last_attempt_at, payload, audio, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'pending')",
            params![
                partition.as_str(),
                item.id,
                item.created_at.to_rfc3339(),
                item.retry_count,
                item.last_error,
                item.last_attempt_at.map(|t| t.to_rfc3339()),
                payload_json,
                audio,
            ],
        );

        match result {
            Ok(_) => {
                debug!(partition = %partition, id = %item.id, "Item added");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateId {
                    partition,
                    id: item.id.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All pending items in a partition, in insertion order.
    pub fn get_all(&self, partition: Partition) -> StoreResult<Vec<QueueItem>> {
        self.query_items(partition, ItemStatus::Pending)
    }

    /// Dead-lettered items in a partition, kept for inspection.
    pub fn dead_letters(&self, partition: Partition) -> StoreResult<Vec<QueueItem>> {
        self.query_items(partition, ItemStatus::Dead)
    }

    /// Delete one item. Returns false (not an error) if the id is absent.
    pub fn remove(&self, partition: Partition, id: &str) -> StoreResult<bool> {
        let conn = self.conn.lock().expect("lock poisoned");
        let count = conn.execute(
            "DELETE FROM outbox_items WHERE partition = ?1 AND id = ?2",
            params![partition.as_str(), id],
        )?;
        Ok(count > 0)
    }

    /// Remove all items (any status) in a partition. Returns the number removed.
    pub fn clear(&self, partition: Partition) -> StoreResult<usize> {
        let conn = self.conn.lock().expect("lock poisoned");
        let count = conn.execute(
            "DELETE FROM outbox_items WHERE partition = ?1",
            params![partition.as_str()],
        )?;
        debug!(partition = %partition, count, "Partition cleared");
        Ok(count)
    }

    /// Number of pending items in a partition.
    pub fn count(&self, partition: Partition) -> StoreResult<usize> {
        let conn = self.conn.lock().expect("lock poisoned");
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM outbox_items WHERE partition = ?1 AND status = 'pending'",
            params![partition.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Pending counts across all partitions.
    pub fn counts(&self) -> StoreResult<PendingCounts> {
        Ok(PendingCounts {
            drafts: self.count(Partition::Drafts)?,
            voice_recordings: self.count(Partition::VoiceRecordings)?,
            requests: self.count(Partition::PendingRequests)?,
        })
    }

    /// Record a failed delivery attempt in place: increments `retry_count`,
    /// stores the error text and attempt time.
    ///
    /// Returns the new retry count, or `None` if the item is absent.
    pub fn mark_failed(
        &self,
        partition: Partition,
        id: &str,
        error: &str,
    ) -> StoreResult<Option<u32>> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().expect("lock poisoned");
        let count = conn.execute(
            "UPDATE outbox_items
             SET retry_count = retry_count + 1,
                 last_error = ?1,
                 last_attempt_at = ?2
             WHERE partition = ?3 AND id = ?4",
            params![error, now, partition.as_str(), id],
        )?;
        if count == 0 {
            return Ok(None);
        }

        let retry_count: u32 = conn.query_row(
            "SELECT retry_count FROM outbox_items WHERE partition = ?1 AND id = ?2",
            params![partition.as_str(), id],
            |row| row.get(0),
        )?;
        Ok(Some(retry_count))
    }

    /// Move an item to the dead-letter state. It leaves the pending counts
    /// and the drain loop but stays inspectable via [`dead_letters`](Self::dead_letters).
    pub fn mark_dead(&self, partition: Partition, id: &str) -> StoreResult<bool> {
        let conn = self.conn.lock().expect("lock poisoned");
        let count = conn.execute(
            "UPDATE outbox_items SET status = 'dead' WHERE partition = ?1 AND id = ?2",
            params![partition.as_str(), id],
        )?;
        Ok(count > 0)
    }

    fn query_items(&self, partition: Partition, status: ItemStatus) -> StoreResult<Vec<QueueItem>> {
        let conn = self.conn.lock().expect("lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, created_at, retry_count, last_error, last_attempt_at, payload, audio
             FROM outbox_items
             WHERE partition = ?1 AND status = ?2
             ORDER BY created_at ASC, id ASC",
        )?;

        let rows = stmt
            .query_map(params![partition.as_str(), status.as_str()], |row| {
                Ok(RawRow {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                    retry_count: row.get(2)?,
                    last_error: row.get(3)?,
                    last_attempt_at: row.get(4)?,
                    payload: row.get(5)?,
                    audio: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(RawRow::into_item).collect()
    }
}

/// Raw row as stored; payload validation happens after the statement so
/// schema failures surface as [`StoreError::InvalidPayload`].
struct RawRow {
    id: String,
    created_at: String,
    retry_count: u32,
    last_error: Option<String>,
    last_attempt_at: Option<String>,
    payload: String,
    audio: Option<Vec<u8>>,
}

impl RawRow {
    fn into_item(self) -> StoreResult<QueueItem> {
        let mut payload: Payload = serde_json::from_str(&self.payload).map_err(|source| {
            StoreError::InvalidPayload {
                id: self.id.clone(),
                source,
            }
        })?;

        if let Payload::VoiceRecording(p) = &mut payload {
            p.audio = self.audio.unwrap_or_default();
        }

        Ok(QueueItem {
            id: self.id,
            created_at: parse_datetime(self.created_at),
            retry_count: self.retry_count,
            last_error: self.last_error,
            last_attempt_at: self.last_attempt_at.map(parse_datetime),
            payload,
        })
    }
}

/// Parse an RFC3339 datetime string, falling back to current time on error.
fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
