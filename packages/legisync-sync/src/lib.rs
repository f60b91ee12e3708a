/*
 * legisync-sync - Mutation-to-Search Synchronization
 *
 * Keeps the full-text search index in step with the primary record store.
 *
 * Architecture:
 * - Mutation Interceptor (write → durable queue → search upsert)
 * - Search Index Client (Typesense HTTP, in-memory fake)
 * - Per-kind Projection
 * - Queue Replay Worker (catch-up / cold rebuild)
 */

// Public modules
pub mod config;
pub mod error;
pub mod interceptor;
pub mod legislator;
pub mod projection;
pub mod replay;
pub mod search;
pub mod store;

// Re-exports
pub use config::{SearchConfig, SyncConfig};
pub use error::{
    ErrorCategory, IndexError, InterceptError, ProjectionError, PropagationError, Result,
    SyncError,
};
pub use interceptor::{Intercepted, MutationInterceptor, PropagationOutcome, PropagationPolicy};
pub use legislator::{Chamber, LegislatorService, NewLegislator, Party, State};
pub use projection::{collection_schema, Projector, DEFAULT_ORGANIZATION_ID};
pub use replay::{QueueReplayWorker, ReplayReport, RetentionPolicy, RetryPolicy};
pub use search::{
    CollectionSchema, FieldSchema, InMemorySearchIndex, SearchIndex, TypesenseClient,
    UpsertResult,
};
pub use store::InterceptedStore;
