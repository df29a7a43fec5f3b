//! cache_clear tool implementation.
//!
//! Empties the fast cache. Durable records stay, so later lookups are served
//! from the durable store and repopulate the fast cache.

use ipscope_core::{Error, Resolver};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output from the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearOutput {
    pub cleared: bool,
}

/// Implementation of the cache_clear tool.
pub async fn clear_impl(resolver: &Resolver) -> Result<CallToolResult, McpError> {
    resolver.clear_fast_cache().await?;

    let json = serde_json::to_string_pretty(&CacheClearOutput { cleared: true })
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
