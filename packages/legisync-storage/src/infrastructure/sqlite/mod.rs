//! SQLite adapters
//!
//! File-based persistent storage using SQLite. One database file can hold
//! both the update queue and the primary records; open it with `open_shared`
//! and hand the connection to both `from_shared` constructors.

mod queue_store;
mod record_store;

pub use queue_store::SqliteQueueStore;
pub use record_store::SqliteRecordStore;

use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;

use crate::Result;

/// Connection handle shared between adapters
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Open (or create) a database file and initialize the schema
pub fn open_shared(db_path: impl AsRef<Path>) -> Result<SharedConnection> {
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// In-memory database (for testing)
pub fn open_shared_in_memory() -> Result<SharedConnection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Initialize database schema
fn init_schema(conn: &Connection) -> Result<()> {
    // Update queue (append-only intent log)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS update_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            action TEXT NOT NULL,
            entity_kind TEXT NOT NULL,
            payload TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            consumed_at INTEGER
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_update_queue_pending
         ON update_queue(consumed_at, entity_kind, id)",
        [],
    )?;

    // Primary records (one table, keyed by model + id)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS records (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            model TEXT NOT NULL,
            record_id TEXT NOT NULL,
            payload TEXT NOT NULL,
            UNIQUE (model, record_id)
        )",
        [],
    )?;

    // Integer id sequences for models with `IdStrategy::Sequence`
    conn.execute(
        "CREATE TABLE IF NOT EXISTS record_sequences (
            model TEXT PRIMARY KEY,
            last_value INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let shared = open_shared_in_memory().unwrap();
        let conn = shared.lock();
        init_schema(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name IN ('update_queue', 'records', 'record_sequences')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }

    #[tokio::test]
    async fn test_adapters_share_a_connection() {
        use crate::domain::{Model, MutationAction, NewQueueEntry, QueueStore, RecordStore, WatchedKind};
        use serde_json::json;

        let shared = open_shared_in_memory().unwrap();
        let records = SqliteRecordStore::from_shared(shared.clone());
        let queue = SqliteQueueStore::from_shared(shared.clone());

        records.insert(Model::Note, "1", &json!({"id": 1})).await.unwrap();
        queue
            .enqueue(NewQueueEntry::new(MutationAction::Create, WatchedKind::Note, json!({"id": 1})))
            .await
            .unwrap();

        let conn = shared.lock();
        let rows: i64 = conn
            .query_row(
                "SELECT (SELECT COUNT(*) FROM records) + (SELECT COUNT(*) FROM update_queue)",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(rows, 2);
    }
}
