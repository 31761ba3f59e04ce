//! Deferred submissions for the offline page worker.
//!
//! This crate provides:
//! - `SubmissionQueue` - Durable FIFO of write requests (`MemoryQueue`, `FileQueue`)
//! - `SyncRegistry` - Registration of retry opportunities with the scheduler
//! - `DeferralCoordinator` - Answers a write with a redirect and queues it
//! - `RetryTrigger` - Drains the queue when the scheduler signals

mod deferral;
mod entry;
mod error;
mod file;
mod memory;
mod queue;
mod registry;
mod trigger;

pub use deferral::*;
pub use entry::*;
pub use error::*;
pub use file::*;
pub use memory::*;
pub use queue::*;
pub use registry::*;
pub use trigger::*;
