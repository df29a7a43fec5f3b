//! Geolocation record model.
//!
//! A [`GeoRecord`] is what every tier hands back. Its persisted form (the
//! "document") is the JSON encoding with the provenance tag stripped; the
//! durable store keeps that text and the fast cache keeps the same bytes.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Outcome reported by the external lookup service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LookupStatus {
    Success,
    Fail,
}

impl LookupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupStatus::Success => "success",
            LookupStatus::Fail => "fail",
        }
    }
}

/// Which tier satisfied a resolution. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    FastCache,
    DurableStore,
    External,
    /// Placeholder produced by the batch orchestrator for a failed IP.
    Error,
}

/// Geolocation attributes, using the external service's field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeoFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    /// Autonomous system, e.g. "AS15169 Google LLC".
    #[serde(default, rename = "as", skip_serializing_if = "Option::is_none")]
    pub as_name: Option<String>,
}

impl GeoFields {
    pub fn is_empty(&self) -> bool {
        *self == GeoFields::default()
    }
}

/// One IP's resolved metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeoRecord {
    pub ip: String,
    pub status: LookupStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub fields: GeoFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub fetched_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
}

impl GeoRecord {
    /// Placeholder standing in for an IP whose resolution errored.
    pub fn placeholder(ip: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            status: LookupStatus::Fail,
            message: Some(message.into()),
            fields: GeoFields::default(),
            fetched_at: None,
            source: Some(Source::Error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == LookupStatus::Success
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    /// Encode the persisted form: the record without its provenance tag.
    pub fn to_document(&self) -> Result<Vec<u8>, Error> {
        if self.source.is_none() {
            return Ok(serde_json::to_vec(self)?);
        }
        let stripped = GeoRecord { source: None, ..self.clone() };
        Ok(serde_json::to_vec(&stripped)?)
    }

    /// Decode a persisted document. Any stray provenance tag is dropped.
    pub fn from_document(bytes: &[u8]) -> Result<Self, Error> {
        let mut record: GeoRecord = serde_json::from_slice(bytes)?;
        record.source = None;
        Ok(record)
    }
}
