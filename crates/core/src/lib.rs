//! Core types and resolution logic for ipscope.
//!
//! This crate provides:
//! - Three-tier IP resolution (fast cache, durable store, external lookup)
//! - Batch orchestration with chunking, pacing and paged sessions
//! - SQLite durable store and moka/Redis fast cache backends
//! - Unified error types
//! - Configuration structures

pub mod batch;
pub mod config;
pub mod error;
pub mod fast_cache;
pub mod lookup;
pub mod record;
pub mod resolver;
pub mod store;

#[cfg(test)]
pub(crate) mod testutils;

pub use batch::{BatchOptions, BatchOrchestrator, BatchSession, BatchState, ChunkLoad, ChunkReport, IpResolver};
pub use config::{AppConfig, ConfigError, DispatchMode};
pub use error::Error;
pub use fast_cache::FastCache;
pub use lookup::{GeoLookup, LookupResponse};
pub use record::{GeoFields, GeoRecord, LookupStatus, Source};
pub use resolver::{CacheStats, HealthReport, Resolver, ResolverOptions};
pub use store::{DurableStore, GeoDb};
