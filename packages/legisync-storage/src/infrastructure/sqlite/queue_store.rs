//! SQLite Queue Store
//!
//! Durable `update_queue` table. Timestamps are stored as Unix milliseconds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;
use std::path::Path;

use super::{open_shared, open_shared_in_memory, SharedConnection};
use crate::domain::{NewQueueEntry, QueueEntry, QueueStore};
use crate::{Result, StorageError};

const SELECT_COLUMNS: &str = "SELECT id, action, entity_kind, payload, created_at, consumed_at
     FROM update_queue";

/// Row as stored, before the names are parsed back into enums
struct RawEntry {
    id: i64,
    action: String,
    entity_kind: String,
    payload: String,
    created_at: i64,
    consumed_at: Option<i64>,
}

impl RawEntry {
    fn into_entry(self) -> Result<QueueEntry> {
        Ok(QueueEntry {
            id: self.id,
            action: self.action.parse()?,
            entity_kind: self.entity_kind.parse()?,
            payload: serde_json::from_str(&self.payload)?,
            created_at: from_millis(self.created_at)?,
            consumed_at: self.consumed_at.map(from_millis).transpose()?,
        })
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StorageError::serialization(format!("Invalid timestamp: {}", ms)))
}

/// SQLite-based QueueStore implementation
#[derive(Clone)]
pub struct SqliteQueueStore {
    conn: SharedConnection,
}

impl SqliteQueueStore {
    /// Open the queue at the given database path
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_shared(open_shared(db_path)?))
    }

    /// Create an in-memory queue (for testing)
    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_shared(open_shared_in_memory()?))
    }

    /// Use an already-initialized connection
    pub fn from_shared(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn query(&self, sql: &str) -> Result<Vec<QueueEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RawEntry {
                    id: row.get(0)?,
                    action: row.get(1)?,
                    entity_kind: row.get(2)?,
                    payload: row.get(3)?,
                    created_at: row.get(4)?,
                    consumed_at: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(RawEntry::into_entry).collect()
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn enqueue(&self, entry: NewQueueEntry) -> Result<QueueEntry> {
        let payload = serde_json::to_string(&entry.payload)?;
        let created_at = Utc::now();

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO update_queue (action, entity_kind, payload, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.action.as_str(),
                entry.entity_kind.as_str(),
                payload,
                created_at.timestamp_millis()
            ],
        )?;
        let id = conn.last_insert_rowid();

        Ok(QueueEntry {
            id,
            action: entry.action,
            entity_kind: entry.entity_kind,
            payload: entry.payload,
            // Round-trip precision matches what `pending` will read back
            created_at: from_millis(created_at.timestamp_millis())?,
            consumed_at: None,
        })
    }

    async fn pending(&self) -> Result<Vec<QueueEntry>> {
        self.query(&format!(
            "{} WHERE consumed_at IS NULL ORDER BY entity_kind ASC, id ASC",
            SELECT_COLUMNS
        ))
    }

    async fn all(&self) -> Result<Vec<QueueEntry>> {
        self.query(&format!(
            "{} ORDER BY entity_kind ASC, id ASC",
            SELECT_COLUMNS
        ))
    }

    async fn mark_consumed(&self, ids: &[i64]) -> Result<usize> {
        let now = Utc::now().timestamp_millis();
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let mut updated = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE update_queue SET consumed_at = ?1 WHERE id = ?2 AND consumed_at IS NULL",
            )?;
            for id in ids {
                updated += stmt.execute(params![now, id])?;
            }
        }
        tx.commit()?;
        Ok(updated)
    }

    async fn delete(&self, ids: &[i64]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM update_queue WHERE id = ?1")?;
            for id in ids {
                removed += stmt.execute(params![id])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    async fn count_pending(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM update_queue WHERE consumed_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
