//! Batch orchestration: resolve many IPs with chunking, pacing and per-IP
//! failure isolation.
//!
//! A batch is split into contiguous chunks. Each chunk is either resolved one
//! IP at a time with a pacing delay after every IP, or handed to the
//! resolver's batch path in one call, falling back to the sequential path
//! for that chunk if the batch call fails. Errors never abort a batch: the
//! failing IP gets a placeholder record and the rest carry on.

pub mod session;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::Error;
use crate::config::{AppConfig, DispatchMode};
use crate::record::GeoRecord;

pub use session::{BatchSession, BatchState, ChunkLoad, ChunkReport};

/// Resolution surface the orchestrator drives.
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Resolve one IP.
    async fn resolve(&self, ip: &str) -> Result<GeoRecord, Error>;

    /// Resolve a chunk in one pass, one record per IP in input order.
    async fn resolve_chunk(&self, _ips: &[String]) -> Result<Vec<GeoRecord>, Error> {
        Err(Error::BatchUnsupported)
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub chunk_size: usize,
    /// Sleep after each resolved IP (sequential) or each chunk (chunk dispatch).
    pub pacing_delay: Duration,
    pub mode: DispatchMode,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { chunk_size: 10, pacing_delay: Duration::from_millis(100), mode: DispatchMode::Sequential }
    }
}

impl BatchOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self { chunk_size: config.chunk_size, pacing_delay: config.pacing_delay(), mode: config.dispatch_mode }
    }
}

/// Split `ips` into contiguous chunks of at most `chunk_size`, preserving order.
pub fn partition(ips: &[String], chunk_size: usize) -> Vec<Vec<String>> {
    ips.chunks(chunk_size.max(1)).map(<[String]>::to_vec).collect()
}

/// Drives an [`IpResolver`] over batches of IPs.
#[derive(Clone)]
pub struct BatchOrchestrator {
    resolver: Arc<dyn IpResolver>,
    options: BatchOptions,
}

impl BatchOrchestrator {
    pub fn new(resolver: Arc<dyn IpResolver>, options: BatchOptions) -> Self {
        Self { resolver, options }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Resolve every IP, returning one record per input in input order.
    ///
    /// Never fails: IPs whose resolution errors are represented by
    /// placeholder records with `source=error`.
    pub async fn resolve_batch(&self, ips: &[String]) -> Vec<GeoRecord> {
        let session = self.session(ips.to_vec());
        session.run_to_completion().await
    }

    /// Start a paged batch that loads one chunk per request.
    pub fn session(&self, ips: Vec<String>) -> BatchSession {
        BatchSession::new(self.clone(), ips)
    }

    /// Resolve one chunk according to the dispatch mode.
    pub(crate) async fn dispatch_chunk(&self, chunk: &[String]) -> Vec<GeoRecord> {
        if self.options.mode == DispatchMode::Chunk {
            match self.resolver.resolve_chunk(chunk).await {
                Ok(records) if records.len() == chunk.len() => {
                    self.pace().await;
                    return records;
                }
                Ok(records) => tracing::warn!(
                    expected = chunk.len(),
                    got = records.len(),
                    "chunk dispatch returned wrong number of records; resolving sequentially"
                ),
                Err(Error::BatchUnsupported) => {
                    tracing::debug!(size = chunk.len(), "lookup has no batch path; resolving sequentially")
                }
                Err(e) if e.is_transport() => tracing::warn!(
                    size = chunk.len(),
                    error = %e,
                    "chunk dispatch failed; resolving sequentially"
                ),
                Err(e) => tracing::error!(
                    size = chunk.len(),
                    error = %e,
                    "chunk dispatch hit a storage failure; resolving sequentially"
                ),
            }
        }

        self.resolve_sequential(chunk).await
    }

    async fn resolve_sequential(&self, chunk: &[String]) -> Vec<GeoRecord> {
        let mut records = Vec::with_capacity(chunk.len());
        for ip in chunk {
            let record = match self.resolver.resolve(ip).await {
                Ok(record) => record,
                Err(e) => {
                    if e.is_storage() {
                        tracing::error!(ip = %ip, error = %e, "storage failure; substituting placeholder");
                    } else {
                        tracing::warn!(ip = %ip, error = %e, "resolution failed; substituting placeholder");
                    }
                    GeoRecord::placeholder(ip.as_str(), e.to_string())
                }
            };
            records.push(record);
            self.pace().await;
        }
        records
    }

    async fn pace(&self) {
        if !self.options.pacing_delay.is_zero() {
            tokio::time::sleep(self.options.pacing_delay).await;
        }
    }
}
