//! Scripted collaborators for unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::Error;
use crate::fast_cache::FastCache;
use crate::lookup::{GeoLookup, LookupResponse};
use crate::record::{GeoFields, GeoRecord};
use crate::resolver::{ResolutionEvent, ResolutionObserver};
use crate::store::DurableStore;

pub fn us_fields() -> GeoFields {
    GeoFields {
        country: Some("United States".into()),
        country_code: Some("US".into()),
        region_name: Some("Virginia".into()),
        city: Some("Ashburn".into()),
        lat: Some(39.03),
        lon: Some(-77.5),
        isp: Some("Google LLC".into()),
        as_name: Some("AS15169 Google LLC".into()),
        ..Default::default()
    }
}

#[derive(Clone)]
enum Script {
    Answer(LookupResponse),
    Error(String),
}

/// Lookup answering from a fixed script. Unscripted IPs are transport errors.
#[derive(Default)]
pub struct ScriptedLookup {
    script: HashMap<String, Script>,
    batch: bool,
    batch_error: bool,
    calls: Mutex<HashMap<String, usize>>,
    batch_calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed(mut self, ip: &str, fields: GeoFields) -> Self {
        self.script.insert(ip.into(), Script::Answer(LookupResponse::success(fields)));
        self
    }

    pub fn fail(mut self, ip: &str, message: &str) -> Self {
        self.script.insert(ip.into(), Script::Answer(LookupResponse::fail(message)));
        self
    }

    pub fn error(mut self, ip: &str, message: &str) -> Self {
        self.script.insert(ip.into(), Script::Error(message.into()));
        self
    }

    /// Answer batch calls from the same script.
    pub fn with_batch(mut self) -> Self {
        self.batch = true;
        self
    }

    /// Accept batch calls but fail every one of them.
    pub fn with_broken_batch(mut self) -> Self {
        self.batch = true;
        self.batch_error = true;
        self
    }

    pub fn calls(&self, ip: &str) -> usize {
        self.calls.lock().unwrap().get(ip).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn batch_calls(&self) -> Vec<Vec<String>> {
        self.batch_calls.lock().unwrap().clone()
    }

    fn answer(&self, ip: &str) -> Result<LookupResponse, Error> {
        match self.script.get(ip) {
            Some(Script::Answer(response)) => Ok(response.clone()),
            Some(Script::Error(message)) => Err(Error::Transport(message.clone())),
            None => Err(Error::Transport(format!("no script for {ip}"))),
        }
    }
}

#[async_trait]
impl GeoLookup for ScriptedLookup {
    async fn fetch(&self, ip: &str) -> Result<LookupResponse, Error> {
        *self.calls.lock().unwrap().entry(ip.to_string()).or_default() += 1;
        self.answer(ip)
    }

    async fn fetch_batch(&self, ips: &[String]) -> Result<Vec<LookupResponse>, Error> {
        if !self.batch {
            return Err(Error::BatchUnsupported);
        }
        self.batch_calls.lock().unwrap().push(ips.to_vec());
        if self.batch_error {
            return Err(Error::Transport("batch endpoint down".into()));
        }
        ips.iter().map(|ip| self.answer(ip)).collect()
    }
}

/// Fast cache whose every operation fails.
pub struct FailingFastCache;

#[async_trait]
impl FastCache for FailingFastCache {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, Error> {
        Err(Error::FastCache("connection refused".into()))
    }

    async fn set_with_ttl(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), Error> {
        Err(Error::FastCache("connection refused".into()))
    }

    async fn keys_with_prefix(&self, _prefix: &str) -> Result<Vec<String>, Error> {
        Err(Error::FastCache("connection refused".into()))
    }

    async fn clear_all(&self) -> Result<(), Error> {
        Err(Error::FastCache("connection refused".into()))
    }

    async fn ping(&self) -> Result<(), Error> {
        Err(Error::FastCache("connection refused".into()))
    }
}

/// Durable store that is empty and fails either its reads or its writes.
pub struct FailingStore {
    reads: bool,
}

impl FailingStore {
    pub fn reads() -> Self {
        Self { reads: true }
    }

    pub fn writes() -> Self {
        Self { reads: false }
    }

    fn closed() -> Error {
        Error::Database(tokio_rusqlite::Error::ConnectionClosed)
    }
}

#[async_trait]
impl DurableStore for FailingStore {
    async fn find_one(&self, _ip: &str) -> Result<Option<GeoRecord>, Error> {
        if self.reads { Err(Self::closed()) } else { Ok(None) }
    }

    async fn upsert_by_key(&self, _record: &GeoRecord) -> Result<(), Error> {
        Err(Self::closed())
    }

    async fn count(&self) -> Result<u64, Error> {
        if self.reads { Err(Self::closed()) } else { Ok(0) }
    }
}

/// Observer keeping every event it sees.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ResolutionEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ResolutionEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ResolutionObserver for RecordingObserver {
    fn on_event(&self, event: &ResolutionEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
