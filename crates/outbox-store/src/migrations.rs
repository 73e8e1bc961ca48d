//! Store migrations.
//!
//! Migrations are run in order and tracked in the `migrations` table, so
//! `OutboxStore::open` stays idempotent across versions.

use crate::StoreResult;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    debug!(current_version, target_version = CURRENT_VERSION, "Running migrations");

    if current_version < 1 {
        migrate_v1_outbox_items(conn)?;
    }
    if current_version < 2 {
        migrate_v2_item_status(conn)?;
    }

    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: partitioned outbox items table.
fn migrate_v1_outbox_items(conn: &Connection) -> StoreResult<()> {
    info!("Applying migration v1: outbox items");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS outbox_items (
            partition TEXT NOT NULL,
            id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            retry_count INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            last_attempt_at TEXT,
            payload TEXT NOT NULL,
            audio BLOB,
            PRIMARY KEY (partition, id)
        );

        CREATE INDEX IF NOT EXISTS idx_outbox_items_created_at
            ON outbox_items(partition, created_at);
        ",
    )?;

    record_migration(conn, 1, "outbox_items")
}

/// V2: per-item status for dead-lettering.
fn migrate_v2_item_status(conn: &Connection) -> StoreResult<()> {
    info!("Applying migration v2: item status");

    conn.execute_batch(
        "
        ALTER TABLE outbox_items ADD COLUMN status TEXT NOT NULL DEFAULT 'pending';

        CREATE INDEX IF NOT EXISTS idx_outbox_items_status
            ON outbox_items(partition, status);
        ",
    )?;

    record_migration(conn, 2, "item_status")
}
