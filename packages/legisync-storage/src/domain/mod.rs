//! Domain layer
//!
//! # Domain Models
//!
//! - `Model`, `DataAction`: data-access vocabulary
//! - `WatchedKind`, `MutationAction`: propagation allow-lists
//! - `WriteOperation`: one intercepted data-access call
//! - `QueueEntry`: one captured mutation in the durable queue
//!
//! # Port Traits
//!
//! - `QueueStore`: durable queue of captured mutations
//! - `RecordStore`: primary record store
//!
//! # Examples
//!
//! ```rust,ignore
//! use legisync_storage::domain::{Model, RecordStore, WriteOperation};
//!
//! async fn example(store: impl RecordStore) -> Result<()> {
//!     let op = WriteOperation::create(Model::Legislator, json!({"firstName": "Jane"}));
//!     let created = store.apply(&op).await?;
//!     assert!(created.get("id").is_some());
//!     Ok(())
//! }
//! ```

pub mod models;
pub mod mutation;
pub mod ports;

pub use models::{
    document_id, queue_order, DataAction, IdStrategy, Model, MutationAction, NewQueueEntry,
    QueueEntry, WatchedKind, WriteOperation,
};
pub use ports::{QueueStore, RecordStore};
