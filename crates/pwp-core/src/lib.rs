//! Core abstractions for the offline page worker.
//!
//! This crate provides the fundamental types shared by every other crate:
//! - `Request` / `Response` - Immutable HTTP values passed through the worker
//! - `StoredRequest` - Serializable form of a request for durable queues
//! - `WorkerConfig` - Explicit origin and routing configuration
//! - `EventContext` / `KeepAlive` - Per-event lifetime for detached work
//! - `WorkerError` - The worker's error taxonomy

mod config;
mod context;
mod error;
mod lifecycle;
mod message;

pub use config::*;
pub use context::*;
pub use error::*;
pub use lifecycle::*;
pub use message::*;
