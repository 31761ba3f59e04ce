//! Submission queue seam.

use async_trait::async_trait;
use pwp_core::Request;
use uuid::Uuid;

use crate::entry::QueueEntry;
use crate::error::SyncResult;

/// Durable store of deferred write requests.
///
/// Entries are listed in enqueue order. Deleting concurrently from
/// several tasks must be safe; deleting an unknown id is not an error.
#[async_trait]
pub trait SubmissionQueue: Send + Sync {
    /// Append a request. Returns the stored entry.
    async fn enqueue(&self, request: &Request) -> SyncResult<QueueEntry>;

    /// All entries, oldest first.
    async fn list(&self) -> SyncResult<Vec<QueueEntry>>;

    /// Remove an entry. Returns whether it existed.
    async fn delete(&self, id: Uuid) -> SyncResult<bool>;

    /// Number of entries waiting.
    async fn count_pending(&self) -> SyncResult<usize>;

    /// Remove every entry. Returns how many were removed.
    async fn clear(&self) -> SyncResult<usize>;
}
