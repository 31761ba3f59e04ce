//! Retry registration with the scheduler.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::SyncResult;

/// The host's scheduling facility.
///
/// Registering a tag asks the scheduler to signal the worker with that tag
/// when connectivity is likely. Registering a tag that is already pending
/// coalesces with the earlier registration.
#[async_trait]
pub trait SyncRegistry: Send + Sync {
    async fn register(&self, tag: &str) -> SyncResult<()>;
}

/// Registry that remembers pending tags until they are taken.
///
/// Used by hosts that signal the worker themselves (the CLI, tests).
#[derive(Debug, Default)]
pub struct RecordingRegistry {
    pending: Mutex<Vec<String>>,
    registrations: Mutex<usize>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags registered and not yet taken.
    pub fn pending(&self) -> Vec<String> {
        self.pending.lock().clone()
    }

    /// Take every pending tag.
    pub fn take_pending(&self) -> Vec<String> {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Total `register` calls, including coalesced ones.
    pub fn registrations(&self) -> usize {
        *self.registrations.lock()
    }
}

#[async_trait]
impl SyncRegistry for RecordingRegistry {
    async fn register(&self, tag: &str) -> SyncResult<()> {
        *self.registrations.lock() += 1;
        let mut pending = self.pending.lock();
        if !pending.iter().any(|t| t == tag) {
            pending.push(tag.to_string());
        }
        tracing::debug!(tag, "sync registered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_tag_coalesces() {
        let registry = RecordingRegistry::new();
        registry.register("comment-sync").await.unwrap();
        registry.register("comment-sync").await.unwrap();

        assert_eq!(registry.registrations(), 2);
        assert_eq!(registry.take_pending(), vec!["comment-sync"]);
        assert!(registry.pending().is_empty());
    }
}
