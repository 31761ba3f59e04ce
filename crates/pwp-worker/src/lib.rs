//! Offline page worker.
//!
//! Intercepts requests from a page and decides, per request, whether to
//! pass it to the network, serve it stale-while-revalidate from the cache,
//! compose a full page from cached fragments, or defer a write until the
//! network is back.
//!
//! ```ignore
//! use pwp_worker::prelude::*;
//!
//! let worker = Worker::new(config, WorkerParts { fetcher, storage, queue, registry }).await?;
//! worker.install().await?;
//! worker.activate()?;
//!
//! let ctx = EventContext::new();
//! match worker.handle_fetch(request, &ctx).await? {
//!     Dispatch::Respond(response) => send(response),
//!     Dispatch::Stream(page) => stream(page),
//!     Dispatch::Network(request) => send(worker.forward(&request).await?),
//! }
//! ctx.keep_alive.settle().await;
//! ```

mod classify;
mod worker;

pub use classify::*;
pub use worker::*;

pub use pwp_cache;
pub use pwp_core;
pub use pwp_data;
pub use pwp_observability;
pub use pwp_streaming;
pub use pwp_sync;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::classify::*;
    pub use crate::worker::*;
    pub use pwp_cache::*;
    pub use pwp_core::*;
    pub use pwp_data::*;
    pub use pwp_observability::*;
    pub use pwp_streaming::*;
    pub use pwp_sync::*;
}
