//! ip-api response types and normalization.

use ipscope_core::{GeoFields, LookupResponse};
use serde::Deserialize;

use super::IpApiError;

/// Raw response object from ip-api, for both `/json` and `/batch`.
#[derive(Debug, Deserialize)]
pub struct IpApiResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    /// The IP the answer is for.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(flatten)]
    pub fields: GeoFields,
}

impl TryFrom<IpApiResponse> for LookupResponse {
    type Error = IpApiError;

    fn try_from(raw: IpApiResponse) -> Result<Self, Self::Error> {
        match raw.status.as_str() {
            "success" => Ok(LookupResponse::success(raw.fields)),
            "fail" => Ok(LookupResponse::fail(raw.message.unwrap_or_else(|| "lookup failed".to_string()))),
            other => Err(IpApiError::Parse(format!("unexpected status {other:?}"))),
        }
    }
}
