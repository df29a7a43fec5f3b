//! Paged batch sessions.
//!
//! A session resolves its batch one chunk per [`BatchSession::load_next_chunk`]
//! call, so a caller can show the first results while the rest are still
//! pending. Only one chunk may be loading at a time; a request that arrives
//! while a chunk is in flight is turned away without doing anything.

use schemars::JsonSchema;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{BatchOrchestrator, partition};
use crate::record::GeoRecord;

/// Lifecycle of a batch.
///
/// `Idle -> LoadingChunk -> (ChunkLoaded -> LoadingChunk)* -> AllChunksLoaded`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum BatchState {
    Idle,
    LoadingChunk,
    ChunkLoaded,
    AllChunksLoaded,
}

/// Records produced by one chunk load.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChunkReport {
    /// Zero-based chunk number.
    pub chunk_index: usize,
    pub records: Vec<GeoRecord>,
    /// IPs resolved so far, this chunk included.
    pub loaded: usize,
    pub total: usize,
    pub done: bool,
}

/// Result of asking a session for its next chunk.
#[derive(Debug, Clone)]
pub enum ChunkLoad {
    Loaded(ChunkReport),
    /// Another load is in flight; nothing was done.
    Busy,
    /// Every chunk has already been loaded.
    Finished,
}

struct Progress {
    pending: VecDeque<Vec<String>>,
    results: Vec<GeoRecord>,
    chunks_loaded: usize,
    history: Vec<BatchState>,
}

impl Progress {
    fn state(&self) -> BatchState {
        self.history.last().copied().unwrap_or(BatchState::Idle)
    }

    fn enter(&mut self, state: BatchState) {
        tracing::debug!(?state, "batch state change");
        self.history.push(state);
    }
}

/// Clears the in-flight flag even if the load future is dropped.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct BatchSession {
    orchestrator: BatchOrchestrator,
    total: usize,
    loading: AtomicBool,
    progress: Mutex<Progress>,
}

impl BatchSession {
    pub(crate) fn new(orchestrator: BatchOrchestrator, ips: Vec<String>) -> Self {
        let total = ips.len();
        let pending: VecDeque<Vec<String>> = partition(&ips, orchestrator.options().chunk_size).into();
        let mut progress = Progress { pending, results: Vec::with_capacity(total), chunks_loaded: 0, history: vec![] };
        progress.history.push(BatchState::Idle);
        if progress.pending.is_empty() {
            progress.enter(BatchState::AllChunksLoaded);
        }

        Self { orchestrator, total, loading: AtomicBool::new(false), progress: Mutex::new(progress) }
    }

    /// Resolve the next pending chunk.
    pub async fn load_next_chunk(&self) -> ChunkLoad {
        if self.loading.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            tracing::debug!("chunk load already in flight");
            return ChunkLoad::Busy;
        }
        let _guard = LoadingGuard(&self.loading);

        let (chunk, chunk_index) = {
            let mut progress = self.lock();
            let Some(chunk) = progress.pending.pop_front() else {
                return ChunkLoad::Finished;
            };
            progress.enter(BatchState::LoadingChunk);
            (chunk, progress.chunks_loaded)
        };

        let records = self.orchestrator.dispatch_chunk(&chunk).await;

        let mut progress = self.lock();
        progress.results.extend(records.iter().cloned());
        progress.chunks_loaded += 1;
        progress.enter(BatchState::ChunkLoaded);
        let done = progress.pending.is_empty();
        if done {
            progress.enter(BatchState::AllChunksLoaded);
        }

        let loaded = progress.results.len();
        tracing::info!(chunk_index, size = chunk.len(), loaded, total = self.total, "batch chunk loaded");
        ChunkLoad::Loaded(ChunkReport { chunk_index, records, loaded, total: self.total, done })
    }

    /// Load chunks until none remain and return every record in input order.
    pub async fn run_to_completion(&self) -> Vec<GeoRecord> {
        while let ChunkLoad::Loaded(_) = self.load_next_chunk().await {}
        self.results()
    }

    pub fn state(&self) -> BatchState {
        self.lock().state()
    }

    /// Every state the session has been in, oldest first.
    pub fn history(&self) -> Vec<BatchState> {
        self.lock().history.clone()
    }

    /// `(resolved, total)` IP counts.
    pub fn progress(&self) -> (usize, usize) {
        (self.lock().results.len(), self.total)
    }

    pub fn is_finished(&self) -> bool {
        self.state() == BatchState::AllChunksLoaded
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    pub fn results(&self) -> Vec<GeoRecord> {
        self.lock().results.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Progress> {
        self.progress.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
