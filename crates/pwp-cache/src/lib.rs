//! Response cache for the offline page worker.
//!
//! This crate provides:
//! - `CacheStorage` / `CacheStore` - Named, keyed response stores
//! - `MemoryCacheStorage` / `DiskCacheStorage` - In-process and on-disk backends
//! - `StaleWhileRevalidate` - Serve from cache, refresh in the background
//! - `ChangeBroadcaster` - `resource_update` notifications for observers
//! - `add_all` - Install-time bulk seeding
//!
//! # Example
//!
//! ```ignore
//! let store = MemoryCacheStorage::new().open("pwp").await?;
//! let swr = StaleWhileRevalidate::new(store, fetcher, broadcaster, metrics);
//!
//! let response = swr.handle(&request, &ctx.keep_alive).await?;
//! ctx.keep_alive.settle().await;
//! ```

mod disk;
mod error;
mod headers;
mod key;
mod memory;
mod notify;
mod precache;
mod store;
mod swr;

pub use disk::*;
pub use error::*;
pub use headers::*;
pub use key::*;
pub use memory::*;
pub use notify::*;
pub use precache::*;
pub use store::*;
pub use swr::*;
