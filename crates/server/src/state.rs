//! Shared server state and batch session registry.

use ipscope_core::{BatchOrchestrator, BatchSession, GeoDb, Resolver};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Everything the tools need, built once by `main`.
pub struct AppState {
    pub resolver: Arc<Resolver>,
    pub orchestrator: BatchOrchestrator,
    /// Durable store handle for maintenance tools.
    pub store: GeoDb,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(
        resolver: Arc<Resolver>, orchestrator: BatchOrchestrator, store: GeoDb, session_idle_ttl: Duration,
    ) -> Self {
        Self { resolver, orchestrator, store, sessions: SessionRegistry::new(session_idle_ttl) }
    }
}

struct Entry {
    session: Arc<BatchSession>,
    touched: Instant,
}

/// Live paged batch sessions keyed by id.
///
/// Sessions nobody has touched for `idle_ttl` are evicted whenever the
/// registry is accessed, unless a chunk is still loading.
pub struct SessionRegistry {
    next_id: AtomicU64,
    idle_ttl: Duration,
    sessions: Mutex<HashMap<u64, Entry>>,
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration) -> Self {
        Self { next_id: AtomicU64::new(0), idle_ttl, sessions: Mutex::new(HashMap::new()) }
    }

    /// Allocate a session id. Ids start at 1 and are never reused.
    pub fn reserve(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub async fn register(&self, id: u64, session: Arc<BatchSession>) {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();
        self.evict_idle(&mut sessions, now);
        sessions.insert(id, Entry { session, touched: now });
    }

    /// Look up a session and mark it as touched.
    pub async fn get(&self, id: u64) -> Option<Arc<BatchSession>> {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();
        self.evict_idle(&mut sessions, now);
        sessions.get_mut(&id).map(|entry| {
            entry.touched = now;
            entry.session.clone()
        })
    }

    pub async fn remove(&self, id: u64) {
        if self.sessions.lock().await.remove(&id).is_some() {
            tracing::debug!(session_id = id, "batch session dropped");
        }
    }

    #[cfg(test)]
    pub async fn active(&self) -> usize {
        self.sessions.lock().await.len()
    }

    fn evict_idle(&self, sessions: &mut HashMap<u64, Entry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let keep = entry.session.is_loading() || now.duration_since(entry.touched) < self.idle_ttl;
            if !keep {
                tracing::debug!(session_id = *id, "idle batch session evicted");
            }
            keep
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, active = sessions.len(), "evicted idle batch sessions");
        }
    }
}
