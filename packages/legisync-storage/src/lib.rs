//! legisync-storage: durable queue and primary record storage
//!
//! ## Core Principles
//!
//! 1. **Source of truth**: the primary record store owns entity records
//! 2. **Intent log**: every committed watched mutation leaves exactly one queue entry
//! 3. **Append-only**: queue entries are never rewritten, only consumed or removed
//!
//! ## Usage
//!
//! ```rust,ignore
//! use legisync_storage::{NewQueueEntry, MutationAction, QueueStore, WatchedKind};
//! use legisync_storage::infrastructure::SqliteQueueStore;
//!
//! let queue = SqliteQueueStore::open("queue.db")?;
//! queue
//!     .enqueue(NewQueueEntry::new(MutationAction::Create, WatchedKind::Note, payload))
//!     .await?;
//!
//! for entry in queue.pending().await? {
//!     // re-drive into the search index
//! }
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{ErrorKind, Result, StorageError};

pub use domain::{
    document_id, DataAction, Model, MutationAction, NewQueueEntry, QueueEntry, QueueStore,
    RecordStore, WatchedKind, WriteOperation,
};
