//! Infrastructure layer - Storage adapters

pub mod memory;
pub use memory::{InMemoryQueueStore, InMemoryRecordStore};

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteQueueStore, SqliteRecordStore};
