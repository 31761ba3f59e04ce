//! Network path for the offline page worker.
//!
//! This crate provides:
//! - `Fetcher` - The network seam every request goes through
//! - `HttpFetcher` - reqwest-backed implementation with credential handling
//! - `TimeoutConfig` - Connect and total timeouts
//! - `RetryPolicy` / `BackoffStrategy` - Spacing of repeated sync attempts

mod client;
mod retry;
#[cfg(any(test, feature = "testing"))]
mod scripted;
mod timeout;

pub use client::*;
pub use retry::*;
#[cfg(any(test, feature = "testing"))]
pub use scripted::*;
pub use timeout::*;
