//! Observability infrastructure for the offline page worker.
//!
//! This crate provides:
//! - `init_tracing` - Global tracing subscriber with JSON or human output
//! - `WorkerMetrics` - Counters for cache, composition and sync activity

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;
