//! MCP tool implementations.
//!
//! This module contains all tools exposed by the ipscope server.

pub mod batch;
pub mod cache;
pub mod health;
pub mod lookup;
pub mod sessions;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::IpBatchLookupParams;
pub use cache::StorePurgeParams;
pub use lookup::IpLookupParams;
pub use sessions::{BatchNextParams, BatchStartParams};
