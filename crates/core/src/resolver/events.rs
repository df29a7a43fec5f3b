//! Structured resolution events.
//!
//! The resolver reports every tier it consults to a [`ResolutionObserver`].
//! The default observer turns events into `tracing` records; tests and other
//! backends can plug in their own.

use std::time::Duration;

/// A lookup tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    FastCache,
    DurableStore,
    External,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::FastCache => "fast-cache",
            Tier::DurableStore => "durable-store",
            Tier::External => "external",
        }
    }
}

/// What happened at a tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The tier answered the request.
    Hit,
    /// The tier had nothing; the next tier is consulted.
    Miss,
    /// The external service answered but reported no data for the IP.
    LookupFailed,
    /// The tier could not be read. Fatal for the durable store and the
    /// external lookup; the fast cache treats it as a miss.
    Error(String),
    /// A best-effort write into a faster tier failed.
    WriteFailed(String),
}

/// One tier consultation during a resolution.
#[derive(Debug, Clone)]
pub struct ResolutionEvent {
    pub ip: String,
    pub tier: Tier,
    pub outcome: Outcome,
    /// Time since the resolution started.
    pub elapsed: Duration,
}

/// Receiver of resolution events.
pub trait ResolutionObserver: Send + Sync {
    fn on_event(&self, event: &ResolutionEvent);
}

/// Writes events as `tracing` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ResolutionObserver for TracingObserver {
    fn on_event(&self, event: &ResolutionEvent) {
        let tier = event.tier.as_str();
        let elapsed_ms = event.elapsed.as_secs_f64() * 1000.0;
        match &event.outcome {
            Outcome::Hit => tracing::info!(ip = %event.ip, tier, elapsed_ms, "tier hit"),
            Outcome::Miss => tracing::debug!(ip = %event.ip, tier, elapsed_ms, "tier miss"),
            Outcome::LookupFailed => {
                tracing::info!(ip = %event.ip, tier, elapsed_ms, "lookup returned no data")
            }
            Outcome::Error(error) => {
                tracing::warn!(ip = %event.ip, tier, elapsed_ms, error = %error, "tier read failed")
            }
            Outcome::WriteFailed(error) => {
                tracing::warn!(ip = %event.ip, tier, elapsed_ms, error = %error, "cache population failed")
            }
        }
    }
}
