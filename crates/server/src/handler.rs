//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::state::AppState;
use crate::tools::{
    BatchNextParams, BatchStartParams, IpBatchLookupParams, IpLookupParams, StorePurgeParams, batch, cache, health,
    lookup, sessions,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use std::sync::Arc;

/// The main MCP server handler for ipscope.
#[derive(Clone)]
pub struct IpScopeServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl IpScopeServer {
    /// Create a new server handler.
    pub fn new(state: AppState) -> Self {
        Self { state: Arc::new(state), tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Geolocate one IPv4 address. Served from the fast cache or durable store when possible, otherwise from ip-api.com. Returns the record with its source tier."
    )]
    async fn ip_lookup(&self, params: Parameters<IpLookupParams>) -> Result<CallToolResult, McpError> {
        lookup::lookup_impl(&self.state.resolver, params.0).await
    }

    /// Resolves the whole list before answering; pacing applies between lookups.
    #[tool(
        description = "Geolocate a list of IPv4 addresses in order. Failed addresses get placeholder records instead of aborting the batch. Returns results, total and a summary."
    )]
    async fn ip_batch_lookup(&self, params: Parameters<IpBatchLookupParams>) -> Result<CallToolResult, McpError> {
        batch::batch_impl(&self.state.orchestrator, params.0).await
    }

    #[tool(
        description = "Start a paged batch lookup. Resolves the first chunk and returns it with a session id for batch_next."
    )]
    async fn batch_start(&self, params: Parameters<BatchStartParams>) -> Result<CallToolResult, McpError> {
        sessions::start_impl(&self.state, params.0).await
    }

    #[tool(
        description = "Resolve the next chunk of a paged batch. Reports busy without doing anything if a chunk is already loading."
    )]
    async fn batch_next(&self, params: Parameters<BatchNextParams>) -> Result<CallToolResult, McpError> {
        sessions::next_impl(&self.state, params.0).await
    }

    #[tool(description = "Count records in the durable store and live entries in the fast cache.")]
    async fn cache_stats(&self) -> Result<CallToolResult, McpError> {
        cache::stats_impl(&self.state.resolver).await
    }

    #[tool(description = "Empty the fast cache. Durable records are kept.")]
    async fn cache_clear(&self) -> Result<CallToolResult, McpError> {
        cache::clear_impl(&self.state.resolver).await
    }

    #[tool(description = "Delete durable records whose lookup is older than the given number of days.")]
    async fn store_purge(&self, params: Parameters<StorePurgeParams>) -> Result<CallToolResult, McpError> {
        cache::purge_impl(&self.state.store, params.0).await
    }

    #[tool(description = "Check that the fast cache and durable store are reachable.")]
    async fn health(&self) -> Result<CallToolResult, McpError> {
        health::health_impl(&self.state.resolver).await
    }
}

impl ServerHandler for IpScopeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "ipscope".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "IPv4 geolocation with a fast cache and durable store in front of ip-api.com. \
                 Use batch_start/batch_next for large lists."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
