//! Storage Ports (Trait Interfaces)
//!
//! Port/Adapter pattern for backend flexibility:
//! - Production: SQLite (file-backed, durable)
//! - Testing: InMemory (fast unit tests)

use async_trait::async_trait;
use uuid::Uuid;

use super::models::{IdStrategy, Model, NewQueueEntry, QueueEntry, WriteOperation};
use super::mutation;
use crate::Result;

/// Durable queue of captured mutations (Queue Store Port)
///
/// Entries are appended by the mutation interceptor after a watched write
/// committed, and read by the replay worker.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Append one entry; returns it with its assigned id and timestamp
    async fn enqueue(&self, entry: NewQueueEntry) -> Result<QueueEntry>;

    /// All unconsumed entries, ordered by entity kind ascending then insertion order
    async fn pending(&self) -> Result<Vec<QueueEntry>>;

    /// Every entry including consumed ones, same ordering as `pending`
    async fn all(&self) -> Result<Vec<QueueEntry>>;

    /// Stamp `consumed_at` on the given entries; returns the number updated.
    /// Already-consumed entries keep their original stamp.
    async fn mark_consumed(&self, ids: &[i64]) -> Result<usize>;

    /// Remove the given entries; returns the number removed
    async fn delete(&self, ids: &[i64]) -> Result<usize>;

    /// Number of unconsumed entries
    async fn count_pending(&self) -> Result<usize>;
}

/// Primary record store (source of truth for entity records)
///
/// Adapters implement the primitive operations; `apply` layers the
/// data-access semantics (`create`, `updateMany`, `upsert`, ...) on top.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Next value of the model's integer id sequence (starts at 1)
    async fn next_sequence(&self, model: Model) -> Result<i64>;

    /// Insert a new record. Fails with `InvalidArguments` if `id` is taken.
    async fn insert(&self, model: Model, id: &str, record: &serde_json::Value) -> Result<()>;

    async fn get(&self, model: Model, id: &str) -> Result<Option<serde_json::Value>>;

    /// Records of a model in insertion order
    async fn list(&self, model: Model) -> Result<Vec<serde_json::Value>>;

    /// Apply `edit` to an existing record and store the result as one atomic
    /// read-modify-write. Returns the edited record, or `None` if it does not exist.
    async fn modify(
        &self,
        model: Model,
        id: &str,
        edit: &(dyn for<'v> Fn(&'v mut serde_json::Value) + Send + Sync),
    ) -> Result<Option<serde_json::Value>>;

    /// Remove a record, returning it if it existed
    async fn remove(&self, model: Model, id: &str) -> Result<Option<serde_json::Value>>;

    /// Mint a fresh identifier according to the model's `IdStrategy`
    async fn mint_id(&self, model: Model) -> Result<serde_json::Value> {
        match model.id_strategy() {
            IdStrategy::Uuid => Ok(serde_json::Value::String(Uuid::new_v4().to_string())),
            IdStrategy::Sequence => Ok(serde_json::Value::from(self.next_sequence(model).await?)),
        }
    }

    /// Execute a data-access operation and return what the caller sees
    async fn apply(&self, op: &WriteOperation) -> Result<serde_json::Value> {
        mutation::apply(self, op).await
    }
}
