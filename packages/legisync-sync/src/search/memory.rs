//! In-memory search index

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use super::{require_document_id, CollectionSchema, SearchIndex, UpsertResult};
use crate::error::IndexError;

/// One accepted upsert, in call order
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertRecord {
    pub collection: String,
    pub id: String,
    pub document: serde_json::Value,
}

#[derive(Default)]
struct IndexState {
    schemas: HashMap<String, CollectionSchema>,
    collections: HashMap<String, BTreeMap<String, serde_json::Value>>,
    log: Vec<UpsertRecord>,
    fail_upserts: VecDeque<IndexError>,
    fail_ensures: VecDeque<IndexError>,
    attempts: usize,
}

/// Collection → id → document map
///
/// Queued failures are returned by the next calls, one per call, before any
/// state changes.
#[derive(Clone, Default)]
pub struct InMemorySearchIndex {
    state: Arc<Mutex<IndexState>>,
}

impl InMemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `upsert` fail with `error`
    pub fn fail_next(&self, error: IndexError) {
        self.state.lock().fail_upserts.push_back(error);
    }

    /// Make the next `ensure_collection` fail with `error`
    pub fn fail_next_ensure(&self, error: IndexError) {
        self.state.lock().fail_ensures.push_back(error);
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<serde_json::Value> {
        self.state
            .lock()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned())
    }

    /// Documents of a collection ordered by id
    pub fn documents(&self, collection: &str) -> Vec<serde_json::Value> {
        self.state
            .lock()
            .collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Successful upserts in call order
    pub fn upserts(&self) -> Vec<UpsertRecord> {
        self.state.lock().log.clone()
    }

    /// Every `upsert` call, including failed ones
    pub fn upsert_attempts(&self) -> usize {
        self.state.lock().attempts
    }

    pub fn schema(&self, name: &str) -> Option<CollectionSchema> {
        self.state.lock().schemas.get(name).cloned()
    }
}

#[async_trait]
impl SearchIndex for InMemorySearchIndex {
    async fn upsert(
        &self,
        collection: &str,
        document: &serde_json::Value,
    ) -> Result<UpsertResult, IndexError> {
        let id = require_document_id(collection, document)?;

        let mut state = self.state.lock();
        state.attempts += 1;
        if let Some(error) = state.fail_upserts.pop_front() {
            return Err(error);
        }

        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), document.clone());
        state.log.push(UpsertRecord {
            collection: collection.to_string(),
            id: id.clone(),
            document: document.clone(),
        });

        Ok(UpsertResult {
            collection: collection.to_string(),
            id,
            document: document.clone(),
        })
    }

    async fn ensure_collection(&self, schema: &CollectionSchema) -> Result<(), IndexError> {
        let mut state = self.state.lock();
        if let Some(error) = state.fail_ensures.pop_front() {
            return Err(error);
        }

        state
            .schemas
            .entry(schema.name.clone())
            .or_insert_with(|| schema.clone());
        state.collections.entry(schema.name.clone()).or_default();
        Ok(())
    }
}
