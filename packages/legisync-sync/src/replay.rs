//! Queue replay worker
//!
//! Re-drives pending queue entries into the search index:
//!
//! ```text
//! load_pending → ensure_collections → collapse → project + upsert (retry) → retention
//! ```
//!
//! Only the latest entry per `(kind, document id)` is indexed in a run, so a
//! stale snapshot never overwrites a fresher one.

use legisync_storage::{QueueEntry, QueueStore, WatchedKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::SyncConfig;
use crate::error::{ErrorCategory, IndexError, Result};
use crate::projection::{collection_schema, Projector};
use crate::search::{SearchIndex, UpsertResult};

/// What happens to queue entries once replay is done with them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Stamp `consumed_at`; the row stays for audit
    #[default]
    MarkConsumed,
    Delete,
    /// Leave entries pending (dry runs, cold rebuilds)
    Keep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (0-based): base, 2×base, 4×base, ...
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Pending entries read
    pub read: usize,
    pub indexed: usize,
    /// Older entries for a document that has a newer entry in the same run
    pub superseded: usize,
    /// Payloads that can never be indexed (projection failure, missing id)
    pub skipped: usize,
    /// Retries exhausted, bad credentials or a rejecting index; left pending
    pub failed: usize,
    /// Entries the retention policy consumed or deleted
    pub retained: usize,
}

enum EntryOutcome {
    Indexed(UpsertResult),
    Skipped(String),
    Failed(IndexError),
}

#[derive(Clone)]
pub struct QueueReplayWorker {
    queue: Arc<dyn QueueStore>,
    index: Arc<dyn SearchIndex>,
    projector: Projector,
    retention: RetentionPolicy,
    retry: RetryPolicy,
}

impl QueueReplayWorker {
    pub fn new(
        queue: Arc<dyn QueueStore>,
        index: Arc<dyn SearchIndex>,
        projector: Projector,
    ) -> Self {
        Self {
            queue,
            index,
            projector,
            retention: RetentionPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(
        queue: Arc<dyn QueueStore>,
        index: Arc<dyn SearchIndex>,
        config: &SyncConfig,
    ) -> Self {
        Self::new(
            queue,
            index,
            Projector::new(config.propagation.organization_id.clone()),
        )
        .with_retention(config.replay.retention)
        .with_retry(config.replay.retry_policy())
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Pending entries, kind ascending then insertion order
    pub async fn load_pending(&self) -> Result<Vec<QueueEntry>> {
        Ok(self.queue.pending().await?)
    }

    /// Create every watched kind's collection if missing
    pub async fn ensure_collections(&self) -> Result<()> {
        for kind in WatchedKind::ALL {
            self.index.ensure_collection(&collection_schema(kind)).await?;
        }
        Ok(())
    }

    pub async fn run(&self) -> Result<ReplayReport> {
        let entries = self.load_pending().await?;
        let mut report = ReplayReport {
            read: entries.len(),
            ..ReplayReport::default()
        };
        info!("Replaying {} pending queue entries", entries.len());

        self.ensure_collections().await?;

        let (latest, superseded) = collapse(entries);
        report.superseded = superseded.len();
        let mut done: Vec<i64> = superseded;

        for entry in &latest {
            match self.index_entry(entry).await {
                EntryOutcome::Indexed(upsert) => {
                    report.indexed += 1;
                    done.push(entry.id);
                    info!(
                        "Queue entry {}: indexed {} {}",
                        entry.id, entry.entity_kind, upsert.id
                    );
                }
                EntryOutcome::Skipped(reason) => {
                    report.skipped += 1;
                    done.push(entry.id);
                    warn!("Queue entry {}: skipped: {}", entry.id, reason);
                }
                EntryOutcome::Failed(e) => {
                    report.failed += 1;
                    error!("Queue entry {}: failed ({}): {}", entry.id, e.category(), e);
                }
            }
        }

        done.sort_unstable();
        report.retained = self.apply_retention(&done).await?;

        info!(
            "Replay complete: {} read, {} indexed, {} superseded, {} skipped, {} failed",
            report.read, report.indexed, report.superseded, report.skipped, report.failed
        );
        Ok(report)
    }

    async fn index_entry(&self, entry: &QueueEntry) -> EntryOutcome {
        let document = match self.projector.project(entry.entity_kind, &entry.payload) {
            Ok(document) => document,
            Err(e) => return EntryOutcome::Skipped(format!("projection failed: {}", e)),
        };

        match self
            .upsert_with_retry(entry.entity_kind.collection(), &document)
            .await
        {
            Ok(upsert) => EntryOutcome::Indexed(upsert),
            Err(e) if e.category() == ErrorCategory::Permanent => {
                EntryOutcome::Skipped(e.to_string())
            }
            Err(e) => EntryOutcome::Failed(e),
        }
    }

    async fn upsert_with_retry(
        &self,
        collection: &str,
        document: &serde_json::Value,
    ) -> std::result::Result<UpsertResult, IndexError> {
        let mut retry = 0;
        loop {
            match self.index.upsert(collection, document).await {
                Ok(upsert) => return Ok(upsert),
                Err(e)
                    if e.category() == ErrorCategory::Transient
                        && retry < self.retry.max_retries =>
                {
                    let delay = self.retry.delay_for(retry);
                    warn!(
                        "Upsert to {} failed ({}), retry {}/{} in {:?}",
                        collection,
                        e,
                        retry + 1,
                        self.retry.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn apply_retention(&self, ids: &[i64]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let count = match self.retention {
            RetentionPolicy::MarkConsumed => self.queue.mark_consumed(ids).await?,
            RetentionPolicy::Delete => self.queue.delete(ids).await?,
            RetentionPolicy::Keep => 0,
        };
        Ok(count)
    }
}

/// Split entries into the latest per `(kind, document id)` and the ids of
/// older ones. Entries without an id are kept; the upsert rejects them.
fn collapse(entries: Vec<QueueEntry>) -> (Vec<QueueEntry>, Vec<i64>) {
    let mut latest: HashMap<(WatchedKind, String), i64> = HashMap::new();
    for entry in &entries {
        if let Some(id) = entry.document_id() {
            let slot = latest.entry((entry.entity_kind, id)).or_insert(entry.id);
            *slot = (*slot).max(entry.id);
        }
    }

    let mut survivors = Vec::with_capacity(latest.len());
    let mut superseded = Vec::new();
    for entry in entries {
        let is_latest = match entry.document_id() {
            Some(id) => latest.get(&(entry.entity_kind, id)) == Some(&entry.id),
            None => true,
        };
        if is_latest {
            survivors.push(entry);
        } else {
            superseded.push(entry.id);
        }
    }
    (survivors, superseded)
}
