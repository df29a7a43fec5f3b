//! cache_stats tool implementation.
//!
//! Reports the size of both storage tiers.

use ipscope_core::{Error, Resolver};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};

/// Implementation of the cache_stats tool.
pub async fn stats_impl(resolver: &Resolver) -> Result<CallToolResult, McpError> {
    let stats = resolver.stats().await?;
    let json = serde_json::to_string_pretty(&stats)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize stats: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{json_of, mock_fail, mock_success, state_for};
    use wiremock::MockServer;

    #[tokio::test]
    async fn test_stats_count_successes_only() {
        let server = MockServer::start().await;
        mock_success(&server, "8.8.8.8", "United States").await;
        mock_success(&server, "1.1.1.1", "Australia").await;
        mock_fail(&server, "10.0.0.1", "private range").await;
        let state = state_for(&server, 10).await;

        let empty = json_of(&stats_impl(&state.resolver).await.unwrap());
        assert_eq!(empty["durableRecords"], 0);
        assert_eq!(empty["fastCacheEntries"], 0);

        for ip in ["8.8.8.8", "1.1.1.1", "10.0.0.1"] {
            state.resolver.resolve(ip).await.unwrap();
        }

        let output = json_of(&stats_impl(&state.resolver).await.unwrap());
        assert_eq!(output["durableRecords"], 2);
        assert_eq!(output["fastCacheEntries"], 2);
    }
}
