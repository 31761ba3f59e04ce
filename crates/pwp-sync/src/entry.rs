//! Queued submission records.

use chrono::{DateTime, Utc};
use pwp_core::{Request, StoredRequest, WorkerError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A write request waiting to be replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub request: StoredRequest,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Capture a request for queueing.
    pub fn new(request: &Request) -> Self {
        Self {
            id: Uuid::new_v4(),
            request: StoredRequest::from(request),
            enqueued_at: Utc::now(),
        }
    }

    /// Rebuild the request for replay.
    pub fn to_request(&self) -> Result<Request, WorkerError> {
        Request::try_from(self.request.clone())
    }
}
