//! Mutation interceptor
//!
//! Wraps every data-access call. For watched `(kind, action)` pairs, once the
//! underlying write has committed:
//!
//! 1. append one entry to the durable queue
//! 2. project the result and upsert it into the kind's search collection
//!
//! The write result is returned to the caller unchanged. Propagation failures
//! are reported in `PropagationOutcome`; only a queue failure under
//! `PropagationPolicy::RequireDurableLog` becomes an error.

use legisync_storage::{MutationAction, NewQueueEntry, QueueStore, WatchedKind, WriteOperation};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::{InterceptError, PropagationError};
use crate::projection::Projector;
use crate::search::{SearchIndex, UpsertResult};

/// What to do when propagation fails after the write committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationPolicy {
    /// Log and return the write result
    #[default]
    LogAndContinue,
    /// Fail the call when the queue entry could not be written
    RequireDurableLog,
}

#[derive(Debug)]
pub enum PropagationOutcome {
    /// Not a watched kind/action
    Skipped,
    Indexed {
        entry_id: i64,
        upsert: UpsertResult,
    },
    /// Queued but not indexed; replay will pick it up
    IndexDeferred {
        entry_id: i64,
        error: PropagationError,
    },
    /// Nothing was queued or indexed
    QueueFailed { error: PropagationError },
}

impl PropagationOutcome {
    pub fn entry_id(&self) -> Option<i64> {
        match self {
            PropagationOutcome::Indexed { entry_id, .. }
            | PropagationOutcome::IndexDeferred { entry_id, .. } => Some(*entry_id),
            PropagationOutcome::Skipped | PropagationOutcome::QueueFailed { .. } => None,
        }
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self, PropagationOutcome::Indexed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, PropagationOutcome::Skipped)
    }
}

/// Write result plus what happened downstream
#[derive(Debug)]
pub struct Intercepted {
    pub value: serde_json::Value,
    pub propagation: PropagationOutcome,
}

#[derive(Clone)]
pub struct MutationInterceptor {
    queue: Arc<dyn QueueStore>,
    index: Arc<dyn SearchIndex>,
    projector: Projector,
    policy: PropagationPolicy,
}

impl MutationInterceptor {
    pub fn new(
        queue: Arc<dyn QueueStore>,
        index: Arc<dyn SearchIndex>,
        projector: Projector,
    ) -> Self {
        Self {
            queue,
            index,
            projector,
            policy: PropagationPolicy::default(),
        }
    }

    /// Projection scope and failure policy from the `propagation` section
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
        .with_policy(config.propagation.policy)
    }

    pub fn with_policy(mut self, policy: PropagationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> PropagationPolicy {
        self.policy
    }

    /// Run `proceed(op)` and propagate its result if `op` is watched.
    ///
    /// A failed write is returned as `InterceptError::Write` with no queue
    /// entry and no index call.
    pub async fn intercept<F, Fut, E>(
        &self,
        op: WriteOperation,
        proceed: F,
    ) -> Result<Intercepted, InterceptError<E>>
    where
        F: FnOnce(WriteOperation) -> Fut,
        Fut: Future<Output = Result<serde_json::Value, E>>,
    {
        let watched = op.watched();
        let value = proceed(op).await.map_err(InterceptError::Write)?;

        let Some((kind, action)) = watched else {
            return Ok(Intercepted {
                value,
                propagation: PropagationOutcome::Skipped,
            });
        };

        match self.propagate(kind, action, &value).await {
            // Replay cannot recover a mutation that never reached the queue
            PropagationOutcome::QueueFailed { error }
                if self.policy == PropagationPolicy::RequireDurableLog
                    && !error.is_recoverable() =>
            {
                Err(InterceptError::Propagation(error))
            }
            propagation => Ok(Intercepted { value, propagation }),
        }
    }

    async fn propagate(
        &self,
        kind: WatchedKind,
        action: MutationAction,
        payload: &serde_json::Value,
    ) -> PropagationOutcome {
        let entry = match self
            .queue
            .enqueue(NewQueueEntry::new(action, kind, payload.clone()))
            .await
        {
            Ok(entry) => entry,
            Err(e) => {
                error!("Failed to queue {} {}: {}", kind, action, e);
                return PropagationOutcome::QueueFailed {
                    error: PropagationError::QueueWrite(e),
                };
            }
        };

        let document = match self.projector.project(kind, payload) {
            Ok(document) => document,
            Err(e) => {
                warn!("Queue entry {}: projection failed: {}", entry.id, e);
                return PropagationOutcome::IndexDeferred {
                    entry_id: entry.id,
                    error: PropagationError::Projection(e),
                };
            }
        };
        debug!("Queue entry {}: {} document {}", entry.id, kind, document);

        match self.index.upsert(kind.collection(), &document).await {
            Ok(upsert) => {
                info!(
                    "Queue entry {}: indexed {} {} ({})",
                    entry.id, kind, upsert.id, action
                );
                PropagationOutcome::Indexed {
                    entry_id: entry.id,
                    upsert,
                }
            }
            Err(e) => {
                warn!(
                    "Queue entry {}: index upsert failed ({}): {}",
                    entry.id,
                    e.category(),
                    e
                );
                PropagationOutcome::IndexDeferred {
                    entry_id: entry.id,
                    error: PropagationError::IndexUpsert(e),
                }
            }
        }
    }
}
