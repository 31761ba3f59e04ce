//! In-process submission queue.

use async_trait::async_trait;
use parking_lot::Mutex;
use pwp_core::Request;
use uuid::Uuid;

use crate::entry::QueueEntry;
use crate::error::SyncResult;
use crate::queue::SubmissionQueue;

/// Queue held in memory. Lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    entries: Mutex<Vec<QueueEntry>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionQueue for MemoryQueue {
    async fn enqueue(&self, request: &Request) -> SyncResult<QueueEntry> {
        let entry = QueueEntry::new(request);
        self.entries.lock().push(entry.clone());
        Ok(entry)
    }

    async fn list(&self) -> SyncResult<Vec<QueueEntry>> {
        Ok(self.entries.lock().clone())
    }

    async fn delete(&self, id: Uuid) -> SyncResult<bool> {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        Ok(entries.len() != before)
    }

    async fn count_pending(&self) -> SyncResult<usize> {
        Ok(self.entries.lock().len())
    }

    async fn clear(&self) -> SyncResult<usize> {
        Ok(std::mem::take(&mut *self.entries.lock()).len())
    }
}
