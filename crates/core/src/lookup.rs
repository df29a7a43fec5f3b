//! External lookup collaborator interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::record::{GeoFields, LookupStatus};

/// Normalized answer from the external lookup service for one IP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResponse {
    pub status: LookupStatus,
    /// Failure reason reported by the service (e.g. "private range").
    pub message: Option<String>,
    pub fields: GeoFields,
}

impl LookupResponse {
    pub fn success(fields: GeoFields) -> Self {
        Self { status: LookupStatus::Success, message: None, fields }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self { status: LookupStatus::Fail, message: Some(message.into()), fields: GeoFields::default() }
    }
}

/// Remote geolocation service.
///
/// Implementations own their transport concerns (timeouts, connection reuse).
/// A response with `status=fail` is a normal answer; `Err` means the service
/// could not be reached or answered with something unusable.
#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// Look up a single IP.
    async fn fetch(&self, ip: &str) -> Result<LookupResponse, Error>;

    /// Look up several IPs in one call, one response per IP in input order.
    ///
    /// Services without a batch endpoint keep the default, which refuses.
    async fn fetch_batch(&self, _ips: &[String]) -> Result<Vec<LookupResponse>, Error> {
        Err(Error::BatchUnsupported)
    }
}
