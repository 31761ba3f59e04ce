//! Per-event context handed to worker handlers.

use std::time::{Duration, Instant};

use crate::lifecycle::KeepAlive;

/// Unique identifier of a triggering event (fetch, sync, install).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventId(pub String);

impl EventId {
    /// Generate a new event ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context for one triggering event.
///
/// Handlers return their immediate result and register follow-up work on
/// `keep_alive`; the host awaits `KeepAlive::settle` before it considers the
/// event fully handled.
#[derive(Debug, Clone)]
pub struct EventContext {
    /// Unique event identifier.
    pub event_id: EventId,
    /// Lifetime extension for detached work.
    pub keep_alive: KeepAlive,
    started: Instant,
}

impl EventContext {
    /// Create a new event context.
    pub fn new() -> Self {
        Self {
            event_id: EventId::generate(),
            keep_alive: KeepAlive::new(),
            started: Instant::now(),
        }
    }

    /// Time since the event was received.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for EventContext {
    fn default() -> Self {
        Self::new()
    }
}
