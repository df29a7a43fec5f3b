//! health tool implementation.
//!
//! Checks both storage tiers. The external lookup is not contacted.

use ipscope_core::{Error, HealthReport, Resolver};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::Serialize;

/// Output from the health tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct HealthOutput {
    /// "ok" when both tiers answer, "degraded" otherwise.
    pub status: &'static str,
    #[serde(flatten)]
    pub tiers: HealthReport,
}

/// Implementation of the health tool.
pub async fn health_impl(resolver: &Resolver) -> Result<CallToolResult, McpError> {
    let tiers = resolver.health().await;
    let status = if tiers.is_healthy() { "ok" } else { "degraded" };
    if !tiers.is_healthy() {
        tracing::warn!(?tiers, "storage tier unreachable");
    }

    let json = serde_json::to_string_pretty(&HealthOutput { status, tiers })
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{json_of, state_for};
    use wiremock::MockServer;

    #[tokio::test]
    async fn test_health_ok() {
        let server = MockServer::start().await;
        let state = state_for(&server, 10).await;

        let output = json_of(&health_impl(&state.resolver).await.unwrap());
        assert_eq!(output["status"], "ok");
        assert_eq!(output["fastCache"]["ok"], true);
        assert_eq!(output["durableStore"]["ok"], true);
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
