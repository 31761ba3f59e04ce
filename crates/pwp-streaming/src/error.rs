//! Composition errors.

use pwp_core::WorkerError;

use crate::plan::FragmentSlot;

/// Errors observed while producing or reading a composed body.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ComposeError {
    /// A fragment had neither a cached nor a network response.
    #[error("fragment {slot} unavailable: {reason}")]
    FragmentUnavailable { slot: FragmentSlot, reason: String },

    /// Write attempted after the body was closed or failed.
    #[error("body already finished")]
    Finished,

    /// The reader went away.
    #[error("body receiver dropped")]
    ReceiverDropped,

    /// The writer went away without closing the body.
    #[error("body ended before it was closed")]
    Truncated,

    /// A resolution task panicked or was cancelled.
    #[error("fragment task aborted: {0}")]
    Aborted(String),
}

impl From<ComposeError> for WorkerError {
    fn from(err: ComposeError) -> Self {
        WorkerError::Stream(err.to_string())
    }
}
