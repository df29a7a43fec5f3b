//! store_purge tool implementation.
//!
//! Purges durable records by the age of their lookup.

use chrono::{Duration, Utc};
use ipscope_core::{Error, GeoDb};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the store_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StorePurgeParams {
    /// Purge records whose lookup is older than this many days.
    pub older_than_days: i64,
}

/// Output from the store_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StorePurgeOutput {
    /// Number of records deleted.
    pub deleted: u64,
}

/// Implementation of the store_purge tool.
///
/// Fast cache entries for purged IPs are left to expire on their own TTL.
pub async fn purge_impl(store: &GeoDb, params: StorePurgeParams) -> Result<CallToolResult, McpError> {
    if !(0..=36_500).contains(&params.older_than_days) {
        return Err(Error::InvalidInput("older_than_days must be between 0 and 36500".to_string()).into());
    }

    let cutoff = Utc::now() - Duration::days(params.older_than_days);
    let deleted = store.purge_fetched_before(cutoff).await?;
    tracing::info!(deleted, older_than_days = params.older_than_days, "durable store purged");

    let json = serde_json::to_string_pretty(&StorePurgeOutput { deleted })
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
