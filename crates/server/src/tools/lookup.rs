//! ip_lookup tool implementation.
//!
//! Resolves a single IPv4 address through the cache tiers.

use ipscope_core::{Error, Resolver};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::validate;

/// Parameters for the ip_lookup tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IpLookupParams {
    /// IPv4 address in dotted-quad form, e.g. "8.8.8.8".
    pub ip: String,
}

/// Implementation of the ip_lookup tool.
pub async fn lookup_impl(resolver: &Resolver, params: IpLookupParams) -> Result<CallToolResult, McpError> {
    let ip = validate::ipv4(&params.ip)?;

    let record = resolver.resolve(&ip).await?;
    let json = serde_json::to_string_pretty(&record)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize record: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
