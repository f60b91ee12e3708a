//! SQLite Record Store
//!
//! All models share the `records` table; `seq` preserves insertion order.

use async_trait::async_trait;
use rusqlite::{params, ErrorCode, OptionalExtension};
use std::path::Path;

use super::{open_shared, open_shared_in_memory, SharedConnection};
use crate::domain::{Model, RecordStore};
use crate::{Result, StorageError};

/// SQLite-based RecordStore implementation
#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: SharedConnection,
}

impl SqliteRecordStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_shared(open_shared(db_path)?))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_shared(open_shared_in_memory()?))
    }

    pub fn from_shared(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn next_sequence(&self, model: Model) -> Result<i64> {
        let conn = self.conn.lock();
        let value = conn.query_row(
            "INSERT INTO record_sequences (model, last_value) VALUES (?1, 1)
             ON CONFLICT(model) DO UPDATE SET last_value = last_value + 1
             RETURNING last_value",
            params![model.as_str()],
            |row| row.get(0),
        )?;
        Ok(value)
    }

    async fn insert(&self, model: Model, id: &str, record: &serde_json::Value) -> Result<()> {
        let payload = serde_json::to_string(record)?;
        let conn = self.conn.lock();

        match conn.execute(
            "INSERT INTO records (model, record_id, payload) VALUES (?1, ?2, ?3)",
            params![model.as_str(), id, payload],
        ) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StorageError::invalid_arguments(format!(
                    "Record already exists: {}#{}",
                    model, id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, model: Model, id: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn.lock();
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM records WHERE model = ?1 AND record_id = ?2",
                params![model.as_str(), id],
                |row| row.get(0),
            )
            .optional()?;

        payload
            .map(|p| serde_json::from_str(&p).map_err(StorageError::from))
            .transpose()
    }

    async fn list(&self, model: Model) -> Result<Vec<serde_json::Value>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT payload FROM records WHERE model = ?1 ORDER BY seq ASC")?;
        let payloads = stmt
            .query_map(params![model.as_str()], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        payloads
            .iter()
            .map(|p| serde_json::from_str(p).map_err(StorageError::from))
            .collect()
    }

    async fn modify(
        &self,
        model: Model,
        id: &str,
        edit: &(dyn for<'v> Fn(&'v mut serde_json::Value) + Send + Sync),
    ) -> Result<Option<serde_json::Value>> {
        // The connection lock spans the read and the write
        let conn = self.conn.lock();
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM records WHERE model = ?1 AND record_id = ?2",
                params![model.as_str(), id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(payload) = payload else {
            return Ok(None);
        };

        let mut record: serde_json::Value = serde_json::from_str(&payload)?;
        edit(&mut record);
        conn.execute(
            "UPDATE records SET payload = ?3 WHERE model = ?1 AND record_id = ?2",
            params![model.as_str(), id, serde_json::to_string(&record)?],
        )?;
        Ok(Some(record))
    }

    async fn remove(&self, model: Model, id: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn.lock();
        let payload: Option<String> = conn
            .query_row(
                "DELETE FROM records WHERE model = ?1 AND record_id = ?2 RETURNING payload",
                params![model.as_str(), id],
                |row| row.get(0),
            )
            .optional()?;

        payload
            .map(|p| serde_json::from_str(&p).map_err(StorageError::from))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WriteOperation;
    use crate::ErrorKind;
    use serde_json::json;

    #[tokio::test]
    async fn test_sequence_per_model() {
        let store = SqliteRecordStore::in_memory().unwrap();

        assert_eq!(store.next_sequence(Model::Note).await.unwrap(), 1);
        assert_eq!(store.next_sequence(Model::Note).await.unwrap(), 2);
        assert_eq!(store.next_sequence(Model::Tag).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_get_list_remove() {
        let store = SqliteRecordStore::in_memory().unwrap();

        store
            .insert(Model::Legislator, "b", &json!({"id": "b", "lastName": "Second"}))
            .await
            .unwrap();
        store
            .insert(Model::Legislator, "a", &json!({"id": "a", "lastName": "Third"}))
            .await
            .unwrap();

        let got = store.get(Model::Legislator, "a").await.unwrap().unwrap();
        assert_eq!(got["lastName"], "Third");

        // Insertion order, not id order
        let listed = store.list(Model::Legislator).await.unwrap();
        assert_eq!(listed[0]["id"], "b");
        assert_eq!(listed[1]["id"], "a");

        let removed = store.remove(Model::Legislator, "b").await.unwrap().unwrap();
        assert_eq!(removed["lastName"], "Second");
        assert!(store.get(Model::Legislator, "b").await.unwrap().is_none());
        assert!(store.remove(Model::Legislator, "b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_invalid_arguments() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store.insert(Model::Note, "1", &json!({"id": 1})).await.unwrap();

        let err = store.insert(Model::Note, "1", &json!({"id": 1})).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArguments);
    }

    #[tokio::test]
    async fn test_modify_edits_stored_record() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store
            .insert(Model::Legislator, "a", &json!({"id": "a", "party": "GREEN"}))
            .await
            .unwrap();

        let edited = store
            .modify(Model::Legislator, "a", &|record| {
                record["party"] = json!("OTHER");
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(edited["party"], "OTHER");
        assert_eq!(store.get(Model::Legislator, "a").await.unwrap(), Some(edited));

        assert!(store
            .modify(Model::Legislator, "missing", &|_| {})
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_same_id_in_different_models() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store.insert(Model::Note, "1", &json!({"id": 1})).await.unwrap();
        store.insert(Model::Tag, "1", &json!({"id": 1})).await.unwrap();

        assert_eq!(store.list(Model::Note).await.unwrap().len(), 1);
        assert_eq!(store.list(Model::Tag).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_apply_update_through_sqlite() {
        let store = SqliteRecordStore::in_memory().unwrap();
        let created = store
            .apply(&WriteOperation::create(Model::Note, json!({"content": "draft"})))
            .await
            .unwrap();

        let updated = store
            .apply(&WriteOperation::update(
                Model::Note,
                created["id"].clone(),
                json!({"content": "final"}),
            ))
            .await
            .unwrap();

        assert_eq!(updated["content"], "final");
        assert_eq!(updated["createdAt"], created["createdAt"]);
        let stored = store.get(Model::Note, "1").await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }
}
