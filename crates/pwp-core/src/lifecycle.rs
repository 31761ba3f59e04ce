//! Worker lifecycle and event lifetime extension.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Lifecycle phases of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkerPhase {
    /// Constructed, nothing seeded yet.
    Parsed,
    /// Seeding the cache.
    Installing,
    /// Cache seeded; waiting is skipped so activation follows immediately.
    Installed,
    /// Controls every client.
    Activated,
    /// Installation failed; the worker must be replaced.
    Redundant,
}

impl WorkerPhase {
    /// Whether fetch events are handled in this phase.
    pub fn handles_fetches(&self) -> bool {
        matches!(self, Self::Installed | Self::Activated)
    }
}

impl std::fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parsed => write!(f, "parsed"),
            Self::Installing => write!(f, "installing"),
            Self::Installed => write!(f, "installed"),
            Self::Activated => write!(f, "activated"),
            Self::Redundant => write!(f, "redundant"),
        }
    }
}

/// Keeps an event alive until its detached tasks finish.
///
/// Work registered with `wait_until` starts immediately on the tokio
/// runtime. `settle` waits for everything registered so far, including
/// tasks registered by tasks that were still running.
#[derive(Debug, Clone, Default)]
pub struct KeepAlive {
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl KeepAlive {
    /// Create an empty keep-alive handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `work` as a detached task tied to this event.
    pub fn wait_until<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(work);
        self.tasks.lock().push(handle);
    }

    /// Number of registered tasks that have not finished.
    pub fn pending(&self) -> usize {
        self.tasks.lock().iter().filter(|h| !h.is_finished()).count()
    }

    /// Wait for every registered task. Returns how many were awaited.
    pub async fn settle(&self) -> usize {
        let mut settled = 0;
        loop {
            let batch = std::mem::take(&mut *self.tasks.lock());
            if batch.is_empty() {
                return settled;
            }
            for handle in batch {
                if let Err(e) = handle.await {
                    tracing::error!(error = %e, "detached task did not complete");
                }
                settled += 1;
            }
        }
    }

    /// Whether two handles belong to the same event.
    pub fn same_event(&self, other: &KeepAlive) -> bool {
        Arc::ptr_eq(&self.tasks, &other.tasks)
    }
}
