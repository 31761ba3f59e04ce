//! Error taxonomy for the worker.

/// Errors surfaced by worker operations.
///
/// Only `NoResponseAvailable` ever reaches a client. Network failures are
/// recovered from the cache, replay failures leave the entry queued, and
/// unknown sync tags are logged and ignored.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Neither network nor cache had a response for {url}")]
    NoResponseAvailable { url: String },

    #[error("Network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("Unknown background sync: {0}")]
    UnknownRetryTag(String),

    #[error("Replay of queued submission {id} failed: {reason}")]
    ReplayFailed { id: String, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Stream error: {0}")]
    Stream(String),
}

impl WorkerError {
    /// Build a `NoResponseAvailable` error for a locator.
    pub fn no_response(url: impl Into<String>) -> Self {
        Self::NoResponseAvailable { url: url.into() }
    }

    /// Whether this failure should be surfaced to the client as a failed request.
    pub fn is_client_visible(&self) -> bool {
        matches!(self, Self::NoResponseAvailable { .. } | Self::Stream(_))
    }
}
