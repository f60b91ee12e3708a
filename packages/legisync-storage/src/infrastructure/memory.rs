//! In-Memory stores (for testing)
//!
//! Simple lock-protected collections implementing the storage ports.
//! NOT durable: contents are lost when the process exits.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{queue_order, Model, NewQueueEntry, QueueEntry, QueueStore, RecordStore};
use crate::{Result, StorageError};

// ═══════════════════════════════════════════════════════════════════════════
// Queue
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct QueueState {
    last_id: i64,
    entries: Vec<QueueEntry>,
}

#[derive(Clone, Default)]
pub struct InMemoryQueueStore {
    state: Arc<RwLock<QueueState>>,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn enqueue(&self, entry: NewQueueEntry) -> Result<QueueEntry> {
        let mut state = self.state.write();
        state.last_id += 1;

        let entry = QueueEntry {
            id: state.last_id,
            action: entry.action,
            entity_kind: entry.entity_kind,
            payload: entry.payload,
            created_at: Utc::now(),
            consumed_at: None,
        };
        state.entries.push(entry.clone());
        Ok(entry)
    }

    async fn pending(&self) -> Result<Vec<QueueEntry>> {
        let mut entries: Vec<_> = self
            .state
            .read()
            .entries
            .iter()
            .filter(|e| !e.is_consumed())
            .cloned()
            .collect();
        entries.sort_by(queue_order);
        Ok(entries)
    }

    async fn all(&self) -> Result<Vec<QueueEntry>> {
        let mut entries = self.state.read().entries.clone();
        entries.sort_by(queue_order);
        Ok(entries)
    }

    async fn mark_consumed(&self, ids: &[i64]) -> Result<usize> {
        let now = Utc::now();
        let mut state = self.state.write();

        let mut updated = 0;
        for entry in state.entries.iter_mut() {
            if entry.consumed_at.is_none() && ids.contains(&entry.id) {
                entry.consumed_at = Some(now);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn delete(&self, ids: &[i64]) -> Result<usize> {
        let mut state = self.state.write();
        let before = state.entries.len();
        state.entries.retain(|e| !ids.contains(&e.id));
        Ok(before - state.entries.len())
    }

    async fn count_pending(&self) -> Result<usize> {
        Ok(self
            .state
            .read()
            .entries
            .iter()
            .filter(|e| !e.is_consumed())
            .count())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Records
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct RecordState {
    sequences: HashMap<Model, i64>,
    // Insertion-ordered (id, record) pairs per model
    tables: HashMap<Model, Vec<(String, serde_json::Value)>>,
}

#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    state: Arc<RwLock<RecordState>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn next_sequence(&self, model: Model) -> Result<i64> {
        let mut state = self.state.write();
        let seq = state.sequences.entry(model).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }

    async fn insert(&self, model: Model, id: &str, record: &serde_json::Value) -> Result<()> {
        let mut state = self.state.write();
        let table = state.tables.entry(model).or_default();

        if table.iter().any(|(existing, _)| existing == id) {
            return Err(StorageError::invalid_arguments(format!(
                "Record already exists: {}#{}",
                model, id
            )));
        }
        table.push((id.to_string(), record.clone()));
        Ok(())
    }

    async fn get(&self, model: Model, id: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.state.read().tables.get(&model).and_then(|table| {
            table
                .iter()
                .find(|(existing, _)| existing == id)
                .map(|(_, record)| record.clone())
        }))
    }

    async fn list(&self, model: Model) -> Result<Vec<serde_json::Value>> {
        Ok(self
            .state
            .read()
            .tables
            .get(&model)
            .map(|table| table.iter().map(|(_, record)| record.clone()).collect())
            .unwrap_or_default())
    }

    async fn modify(
        &self,
        model: Model,
        id: &str,
        edit: &(dyn for<'v> Fn(&'v mut serde_json::Value) + Send + Sync),
    ) -> Result<Option<serde_json::Value>> {
        let mut state = self.state.write();
        let slot = state
            .tables
            .get_mut(&model)
            .and_then(|table| table.iter_mut().find(|(existing, _)| existing == id));

        Ok(slot.map(|(_, current)| {
            edit(current);
            current.clone()
        }))
    }

    async fn remove(&self, model: Model, id: &str) -> Result<Option<serde_json::Value>> {
        let mut state = self.state.write();
        let Some(table) = state.tables.get_mut(&model) else {
            return Ok(None);
        };

        match table.iter().position(|(existing, _)| existing == id) {
            Some(index) => Ok(Some(table.remove(index).1)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MutationAction, WatchedKind, WriteOperation};
    use crate::ErrorKind;
    use serde_json::json;

    #[tokio::test]
    async fn test_queue_enqueue_assigns_increasing_ids() {
        let queue = InMemoryQueueStore::new();

        let a = queue
            .enqueue(NewQueueEntry::new(
                MutationAction::Create,
                WatchedKind::Note,
                json!({"id": 1}),
            ))
            .await
            .unwrap();
        let b = queue
            .enqueue(NewQueueEntry::new(
                MutationAction::Update,
                WatchedKind::Note,
                json!({"id": 1}),
            ))
            .await
            .unwrap();

        assert!(b.id > a.id);
        assert_eq!(queue.count_pending().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_queue_mark_consumed_hides_from_pending() {
        let queue = InMemoryQueueStore::new();
        let entry = queue
            .enqueue(NewQueueEntry::new(
                MutationAction::Create,
                WatchedKind::Legislator,
                json!({"id": "a"}),
            ))
            .await
            .unwrap();

        assert_eq!(queue.mark_consumed(&[entry.id]).await.unwrap(), 1);
        assert_eq!(queue.mark_consumed(&[entry.id]).await.unwrap(), 0);
        assert!(queue.pending().await.unwrap().is_empty());
        assert_eq!(queue.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_queue_delete() {
        let queue = InMemoryQueueStore::new();
        let entry = queue
            .enqueue(NewQueueEntry::new(
                MutationAction::Delete,
                WatchedKind::Note,
                json!({"id": 3}),
            ))
            .await
            .unwrap();

        assert_eq!(queue.delete(&[entry.id, 999]).await.unwrap(), 1);
        assert!(queue.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_records_note_ids_are_sequential_integers() {
        let store = InMemoryRecordStore::new();

        let first = store
            .apply(&WriteOperation::create(Model::Note, json!({"content": "a"})))
            .await
            .unwrap();
        let second = store
            .apply(&WriteOperation::create(Model::Note, json!({"content": "b"})))
            .await
            .unwrap();

        assert_eq!(first["id"], json!(1));
        assert_eq!(second["id"], json!(2));
    }

    #[tokio::test]
    async fn test_records_duplicate_insert_rejected() {
        let store = InMemoryRecordStore::new();
        store.insert(Model::Tag, "t1", &json!({"id": "t1"})).await.unwrap();

        let err = store
            .insert(Model::Tag, "t1", &json!({"id": "t1"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArguments);
    }

    #[tokio::test]
    async fn test_records_modify_and_remove_missing() {
        let store = InMemoryRecordStore::new();
        assert!(store.modify(Model::Tag, "nope", &|_| {}).await.unwrap().is_none());
        assert!(store.remove(Model::Tag, "nope").await.unwrap().is_none());
    }
}
