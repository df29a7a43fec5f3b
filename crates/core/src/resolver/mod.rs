//! Resolution engine: cache-aside lookup of one IP across three tiers.
//!
//! Tiers are consulted in order, each at most once per call:
//!
//! 1. fast cache: a live entry is returned as-is
//! 2. durable store: a stored record is returned and copied into the fast cache
//! 3. external lookup: successful answers are upserted into the durable store
//!    and then copied into the fast cache; failed answers are returned untouched
//!
//! Copies into faster tiers are best effort. Their failures are reported as
//! events and never fail the call, because the caller's answer is already in
//! hand. Reading the durable store and calling the external lookup are
//! required steps and their errors propagate.

pub mod events;

use async_trait::async_trait;
use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::Error;
use crate::batch::IpResolver;
use crate::config::AppConfig;
use crate::fast_cache::{FastCache, cache_key};
use crate::lookup::{GeoLookup, LookupResponse};
use crate::record::{GeoFields, GeoRecord, Source};
use crate::store::DurableStore;

pub use events::{Outcome, ResolutionEvent, ResolutionObserver, Tier, TracingObserver};

/// Tunables for the resolution engine.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Lifetime of fast cache entries.
    pub ttl: Duration,
    /// Namespace prefix for fast cache keys.
    pub key_prefix: String,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self { ttl: Duration::from_secs(86_400), key_prefix: "ip:".into() }
    }
}

impl ResolverOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self { ttl: config.cache_ttl(), key_prefix: config.cache_key_prefix.clone() }
    }
}

/// Aggregate tier sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Records in the durable store.
    pub durable_records: u64,
    /// Live entries in the fast cache.
    pub fast_cache_entries: u64,
}

/// Reachability of one storage tier.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TierHealth {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<(), Error>> for TierHealth {
    fn from(result: Result<(), Error>) -> Self {
        match result {
            Ok(()) => Self { ok: true, error: None },
            Err(e) => Self { ok: false, error: Some(e.to_string()) },
        }
    }
}

/// Reachability of both storage tiers.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub fast_cache: TierHealth,
    pub durable_store: TierHealth,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.fast_cache.ok && self.durable_store.ok
    }
}

/// The resolution engine.
///
/// Collaborators are injected ready to use; their connection lifecycle
/// belongs to whoever built them.
pub struct Resolver {
    fast_cache: Arc<dyn FastCache>,
    store: Arc<dyn DurableStore>,
    lookup: Arc<dyn GeoLookup>,
    options: ResolverOptions,
    observer: Arc<dyn ResolutionObserver>,
}

impl Resolver {
    pub fn new(
        fast_cache: Arc<dyn FastCache>, store: Arc<dyn DurableStore>, lookup: Arc<dyn GeoLookup>,
        options: ResolverOptions,
    ) -> Self {
        Self { fast_cache, store, lookup, options, observer: Arc::new(TracingObserver) }
    }

    /// Replace the default tracing observer.
    pub fn with_observer(mut self, observer: Arc<dyn ResolutionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Resolve one IP through the tiers.
    ///
    /// # Errors
    ///
    /// Returns the durable store's error if it cannot be read, and the
    /// external lookup's error if it cannot be reached. A lookup that the
    /// service answers with `status=fail` is returned as a record, not an error.
    pub async fn resolve(&self, ip: &str) -> Result<GeoRecord, Error> {
        let started = Instant::now();

        if let Some(record) = self.from_storage(ip, started).await? {
            return Ok(record);
        }

        let response = match self.lookup.fetch(ip).await {
            Ok(response) => response,
            Err(e) => {
                self.emit(ip, Tier::External, Outcome::Error(e.to_string()), started);
                return Err(e);
            }
        };

        Ok(self.record_external(ip, response, started).await)
    }

    /// Sizes of both tiers.
    pub async fn stats(&self) -> Result<CacheStats, Error> {
        let durable_records = self.store.count().await?;
        let fast_cache_entries = self.fast_cache.keys_with_prefix(&self.options.key_prefix).await?.len() as u64;
        Ok(CacheStats { durable_records, fast_cache_entries })
    }

    /// Drop every fast cache entry. The durable store is untouched.
    pub async fn clear_fast_cache(&self) -> Result<(), Error> {
        self.fast_cache.clear_all().await?;
        tracing::info!("fast cache cleared");
        Ok(())
    }

    /// Check both storage tiers.
    pub async fn health(&self) -> HealthReport {
        let fast_cache = self.fast_cache.ping().await.into();
        let durable_store = self.store.ping().await.into();
        HealthReport { fast_cache, durable_store }
    }

    /// Tiers 1 and 2. `Ok(None)` means both missed.
    async fn from_storage(&self, ip: &str, started: Instant) -> Result<Option<GeoRecord>, Error> {
        let key = cache_key(&self.options.key_prefix, ip);

        match self.fast_cache.get(&key).await {
            Ok(Some(bytes)) => match GeoRecord::from_document(&bytes) {
                Ok(record) => {
                    self.emit(ip, Tier::FastCache, Outcome::Hit, started);
                    return Ok(Some(record.with_source(Source::FastCache)));
                }
                Err(e) => {
                    self.emit(ip, Tier::FastCache, Outcome::Error(format!("undecodable entry: {e}")), started)
                }
            },
            Ok(None) => self.emit(ip, Tier::FastCache, Outcome::Miss, started),
            Err(e) => self.emit(ip, Tier::FastCache, Outcome::Error(e.to_string()), started),
        }

        let stored = match self.store.find_one(ip).await {
            Ok(stored) => stored,
            Err(e) => {
                self.emit(ip, Tier::DurableStore, Outcome::Error(e.to_string()), started);
                return Err(e);
            }
        };

        let Some(record) = stored else {
            self.emit(ip, Tier::DurableStore, Outcome::Miss, started);
            return Ok(None);
        };

        self.emit(ip, Tier::DurableStore, Outcome::Hit, started);
        self.populate_fast_cache(&key, &record, started).await;
        Ok(Some(record.with_source(Source::DurableStore)))
    }

    /// Tier 3 bookkeeping: build the record and persist it if it succeeded.
    async fn record_external(&self, ip: &str, response: LookupResponse, started: Instant) -> GeoRecord {
        let LookupResponse { status, message, fields } = response;
        let mut record = GeoRecord {
            ip: ip.to_string(),
            status,
            message,
            fields: GeoFields::default(),
            fetched_at: Some(Utc::now()),
            source: None,
        };

        if !record.is_success() {
            self.emit(ip, Tier::External, Outcome::LookupFailed, started);
            return record.with_source(Source::External);
        }

        record.fields = fields;
        self.emit(ip, Tier::External, Outcome::Hit, started);

        match self.store.upsert_by_key(&record).await {
            Ok(()) => {
                let key = cache_key(&self.options.key_prefix, ip);
                self.populate_fast_cache(&key, &record, started).await;
            }
            // Without a durable copy the fast cache is left alone so the two
            // tiers never disagree.
            Err(e) => self.emit(ip, Tier::DurableStore, Outcome::WriteFailed(e.to_string()), started),
        }

        record.with_source(Source::External)
    }

    async fn populate_fast_cache(&self, key: &str, record: &GeoRecord, started: Instant) {
        let written = match record.to_document() {
            Ok(doc) => self.fast_cache.set_with_ttl(key, &doc, self.options.ttl).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            self.emit(&record.ip, Tier::FastCache, Outcome::WriteFailed(e.to_string()), started);
        }
    }

    fn emit(&self, ip: &str, tier: Tier, outcome: Outcome, started: Instant) {
        self.observer.on_event(&ResolutionEvent { ip: ip.to_string(), tier, outcome, elapsed: started.elapsed() });
    }
}

#[async_trait]
impl IpResolver for Resolver {
    async fn resolve(&self, ip: &str) -> Result<GeoRecord, Error> {
        Resolver::resolve(self, ip).await
    }

    /// Resolve a chunk with a single external call for all storage misses.
    async fn resolve_chunk(&self, ips: &[String]) -> Result<Vec<GeoRecord>, Error> {
        let started = Instant::now();
        let mut slots: Vec<Option<GeoRecord>> = Vec::with_capacity(ips.len());
        let mut misses = Vec::new();

        for ip in ips {
            let hit = self.from_storage(ip, started).await?;
            if hit.is_none() {
                misses.push(ip.clone());
            }
            slots.push(hit);
        }

        if misses.is_empty() {
            return Ok(slots.into_iter().flatten().collect());
        }

        let responses = match self.lookup.fetch_batch(&misses).await {
            Ok(responses) => responses,
            Err(e) => {
                tracing::debug!(misses = misses.len(), error = %e, "batch lookup failed");
                return Err(e);
            }
        };
        if responses.len() != misses.len() {
            return Err(Error::Transport(format!(
                "batch lookup returned {} responses for {} IPs",
                responses.len(),
                misses.len()
            )));
        }

        let mut responses = responses.into_iter();
        for (slot, ip) in slots.iter_mut().zip(ips) {
            if slot.is_none()
                && let Some(response) = responses.next()
            {
                *slot = Some(self.record_external(ip, response, started).await);
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }
}
