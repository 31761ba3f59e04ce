//! Sync error types.

use pwp_core::WorkerError;

/// Result type for queue and registry operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors from the submission queue and sync registry.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Failed to read or write the queue file.
    #[error("queue storage error: {0}")]
    Storage(String),

    /// Failed to (de)serialize queue contents.
    #[error("queue serialization error: {0}")]
    Serialization(String),

    /// The scheduler refused a registration.
    #[error("sync registration failed for {tag}: {reason}")]
    Registration { tag: String, reason: String },
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<SyncError> for WorkerError {
    fn from(err: SyncError) -> Self {
        WorkerError::Queue(err.to_string())
    }
}
