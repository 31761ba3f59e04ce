//! Streaming page composition.
//!
//! This crate assembles full pages from cached fragments:
//! - `body_channel` - `BodyWriter` / `BodyStream` pair with explicit close
//! - `StreamingResponse` - Status and headers around a streamed body
//! - `FragmentPlan` - Header, page body and footer requests for a navigation
//! - `FragmentComposer` - Resolves fragments concurrently, writes them in order

mod body;
mod composer;
mod error;
mod plan;
mod response;

pub use body::*;
pub use composer::*;
pub use error::*;
pub use plan::*;
pub use response::*;
