//! Queue draining on scheduler signals.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use pwp_core::{WorkerConfig, WorkerError};
use pwp_data::Fetcher;
use pwp_observability::WorkerMetrics;
use serde::{Deserialize, Serialize};

use crate::entry::QueueEntry;
use crate::queue::SubmissionQueue;

/// Whether a drain cycle is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerState {
    Idle,
    Draining,
}

/// Outcome of one drain cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DrainReport {
    /// Entries read at the start of the cycle.
    pub attempted: usize,
    /// Entries replayed and deleted.
    pub succeeded: usize,
    /// Entries left queued.
    pub failed: usize,
    /// Entries still queued after the cycle, including ones enqueued meanwhile.
    pub remaining: usize,
}

impl DrainReport {
    /// Whether the scheduler should consider the sync done.
    ///
    /// `false` asks the scheduler to signal again later.
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

/// Replays queued submissions when the scheduler signals a sync tag.
pub struct RetryTrigger {
    queue: Arc<dyn SubmissionQueue>,
    fetcher: Arc<dyn Fetcher>,
    tags: Vec<String>,
    draining: AtomicUsize,
    metrics: Arc<WorkerMetrics>,
}

struct DrainGuard<'a>(&'a AtomicUsize);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RetryTrigger {
    /// Create a trigger accepting the configured sync tag and its aliases.
    pub fn new(
        queue: Arc<dyn SubmissionQueue>,
        fetcher: Arc<dyn Fetcher>,
        config: &WorkerConfig,
        metrics: Arc<WorkerMetrics>,
    ) -> Self {
        let mut tags = vec![config.sync_tag.clone()];
        tags.extend(config.extra_sync_tags.iter().cloned());
        Self {
            queue,
            fetcher,
            tags,
            draining: AtomicUsize::new(0),
            metrics,
        }
    }

    pub fn state(&self) -> TriggerState {
        if self.draining.load(Ordering::SeqCst) > 0 {
            TriggerState::Draining
        } else {
            TriggerState::Idle
        }
    }

    /// Whether `tag` starts a drain.
    pub fn accepts(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Handle a scheduler signal.
    ///
    /// Unknown tags are logged and rejected without touching the queue.
    /// Otherwise every queued entry is replayed concurrently; successful
    /// replays are deleted, failed ones stay for the next signal.
    pub async fn handle_signal(&self, tag: &str) -> Result<DrainReport, WorkerError> {
        if !self.accepts(tag) {
            tracing::error!(tag, "Unknown background sync");
            return Err(WorkerError::UnknownRetryTag(tag.to_string()));
        }

        self.draining.fetch_add(1, Ordering::SeqCst);
        let _guard = DrainGuard(&self.draining);

        let entries = self.queue.list().await?;
        let attempted = entries.len();
        tracing::info!(tag, entries = attempted, "draining submission queue");

        let outcomes = join_all(entries.iter().map(|entry| self.replay(entry))).await;
        let mut succeeded = 0;
        for outcome in outcomes {
            match outcome {
                Ok(()) => succeeded += 1,
                Err(e) => tracing::warn!(error = %e, "submission stays queued"),
            }
        }

        let remaining = self.queue.count_pending().await?;
        let report = DrainReport {
            attempted,
            succeeded,
            failed: attempted - succeeded,
            remaining,
        };
        self.metrics
            .record_drain(report.succeeded as u64, report.failed as u64);

        if report.is_complete() {
            tracing::info!(tag, succeeded, "submission queue drained");
        } else {
            tracing::warn!(tag, succeeded, remaining, "submission queue not drained, retry later");
        }
        Ok(report)
    }

    async fn replay(&self, entry: &QueueEntry) -> Result<(), WorkerError> {
        let failed = |reason: String| WorkerError::ReplayFailed {
            id: entry.id.to_string(),
            reason,
        };

        let request = entry.to_request().map_err(|e| failed(e.to_string()))?;
        let response = self
            .fetcher
            .fetch(&request)
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            return Err(failed(format!("status {}", status)));
        }

        self.queue
            .delete(entry.id)
            .await
            .map_err(|e| failed(e.to_string()))?;
        tracing::debug!(id = %entry.id, status = status.as_u16(), "submission replayed");
        Ok(())
    }
}
