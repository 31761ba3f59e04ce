//! File-backed submission queue.
//!
//! The whole queue lives in one JSON file. Every mutation rewrites it to a
//! temporary file and renames it into place while holding the queue lock,
//! so concurrent deletes never lose each other's updates and a crash leaves
//! either the old or the new contents.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pwp_core::Request;
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::entry::QueueEntry;
use crate::error::SyncResult;
use crate::queue::SubmissionQueue;

/// Queue persisted to a JSON file. Survives restarts.
#[derive(Debug)]
pub struct FileQueue {
    path: PathBuf,
    entries: Mutex<Vec<QueueEntry>>,
}

impl FileQueue {
    /// Open the queue at `path`, loading existing entries.
    pub async fn open(path: impl Into<PathBuf>) -> SyncResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let entries = match fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "opened submission queue");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &[QueueEntry]) -> SyncResult<()> {
        let data = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SubmissionQueue for FileQueue {
    async fn enqueue(&self, request: &Request) -> SyncResult<QueueEntry> {
        let entry = QueueEntry::new(request);
        let mut entries = self.entries.lock().await;
        entries.push(entry.clone());
        if let Err(e) = self.persist(&entries).await {
            entries.pop();
            return Err(e);
        }
        Ok(entry)
    }

    async fn list(&self) -> SyncResult<Vec<QueueEntry>> {
        Ok(self.entries.lock().await.clone())
    }

    async fn delete(&self, id: Uuid) -> SyncResult<bool> {
        let mut entries = self.entries.lock().await;
        let Some(index) = entries.iter().position(|e| e.id == id) else {
            return Ok(false);
        };
        let removed = entries.remove(index);
        if let Err(e) = self.persist(&entries).await {
            entries.insert(index, removed);
            return Err(e);
        }
        Ok(true)
    }

    async fn count_pending(&self) -> SyncResult<usize> {
        Ok(self.entries.lock().await.len())
    }

    async fn clear(&self) -> SyncResult<usize> {
        let mut entries = self.entries.lock().await;
        let removed = entries.len();
        self.persist(&[]).await?;
        entries.clear();
        Ok(removed)
    }
}
