//! batch_start and batch_next tool implementations.
//!
//! Paged batches resolve one chunk per call. `batch_start` registers the
//! session and loads its first chunk; `batch_next` loads the following one.
//! A session is dropped from the registry as soon as its last chunk loads, or
//! once it has gone unused for the configured idle lifetime.

use ipscope_core::{BatchState, ChunkLoad, ChunkReport, Error};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ServerError;
use crate::state::AppState;
use crate::validate;

/// Parameters for the batch_start tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchStartParams {
    /// IPv4 addresses to resolve, in order.
    pub ips: Vec<String>,
}

/// Parameters for the batch_next tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchNextParams {
    /// Id returned by batch_start.
    pub session_id: u64,
}

/// One page of a paged batch.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchPage {
    pub session_id: u64,
    pub state: BatchState,
    /// True when a chunk was already loading and this call did nothing.
    pub busy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk: Option<ChunkReport>,
    pub loaded: usize,
    pub total: usize,
    pub done: bool,
}

async fn load_page(state: &AppState, session_id: u64) -> Result<BatchPage, ServerError> {
    let session = state.sessions.get(session_id).await.ok_or(ServerError::UnknownSession(session_id))?;

    let (chunk, busy) = match session.load_next_chunk().await {
        ChunkLoad::Loaded(report) => (Some(report), false),
        ChunkLoad::Busy => (None, true),
        ChunkLoad::Finished => (None, false),
    };

    let done = session.is_finished();
    if done {
        state.sessions.remove(session_id).await;
    }

    let (loaded, total) = session.progress();
    Ok(BatchPage { session_id, state: session.state(), busy, chunk, loaded, total, done })
}

fn page_result(page: &BatchPage) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(page)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Implementation of the batch_start tool.
pub async fn start_impl(state: &AppState, params: BatchStartParams) -> Result<CallToolResult, McpError> {
    let ips = validate::ipv4_list(&params.ips)?;

    let session_id = state.sessions.reserve();
    state.sessions.register(session_id, Arc::new(state.orchestrator.session(ips))).await;
    tracing::info!(session_id, total = params.ips.len(), "batch session started");

    let page = load_page(state, session_id).await?;
    page_result(&page)
}

/// Implementation of the batch_next tool.
pub async fn next_impl(state: &AppState, params: BatchNextParams) -> Result<CallToolResult, McpError> {
    let page = load_page(state, params.session_id).await?;
    page_result(&page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{SESSION_IDLE_TTL, json_of, mock_success, state_for};
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ips(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("203.0.113.{i}")).collect()
    }

    async fn mock_all(server: &MockServer, n: usize) {
        for ip in ips(n) {
            mock_success(server, &ip, "Testland").await;
        }
    }

    #[tokio::test]
    async fn test_paged_batch_runs_to_completion() {
        let server = MockServer::start().await;
        mock_all(&server, 25).await;
        let state = state_for(&server, 10).await;

        let first = json_of(&start_impl(&state, BatchStartParams { ips: ips(25) }).await.unwrap());
        assert_eq!(first["loaded"], 10);
        assert_eq!(first["total"], 25);
        assert_eq!(first["state"], "chunkLoaded");
        assert_eq!(first["done"], false);
        let session_id = first["sessionId"].as_u64().unwrap();

        let second = json_of(&next_impl(&state, BatchNextParams { session_id }).await.unwrap());
        assert_eq!(second["chunk"]["records"].as_array().unwrap().len(), 10);
        assert_eq!(second["chunk"]["chunkIndex"], 1);

        let third = json_of(&next_impl(&state, BatchNextParams { session_id }).await.unwrap());
        assert_eq!(third["chunk"]["records"].as_array().unwrap().len(), 5);
        assert_eq!(third["state"], "allChunksLoaded");
        assert_eq!(third["done"], true);
        assert_eq!(state.sessions.active().await, 0);

        let err = next_impl(&state, BatchNextParams { session_id }).await.unwrap_err();
        assert_eq!(err.code.0, -32004);
    }

    #[tokio::test]
    async fn test_single_chunk_finishes_on_start() {
        let server = MockServer::start().await;
        mock_all(&server, 3).await;
        let state = state_for(&server, 10).await;

        let page = json_of(&start_impl(&state, BatchStartParams { ips: ips(3) }).await.unwrap());
        assert_eq!(page["done"], true);
        assert_eq!(page["chunk"]["records"].as_array().unwrap().len(), 3);
        assert_eq!(state.sessions.active().await, 0);
    }

    #[tokio::test]
    async fn test_empty_start() {
        let server = MockServer::start().await;
        let state = state_for(&server, 10).await;

        let page = json_of(&start_impl(&state, BatchStartParams { ips: vec![] }).await.unwrap());
        assert_eq!(page["done"], true);
        assert_eq!(page["total"], 0);
        assert!(page.get("chunk").is_none());
        assert_eq!(state.sessions.active().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_start_registers_nothing() {
        let server = MockServer::start().await;
        let state = state_for(&server, 10).await;

        let err = start_impl(&state, BatchStartParams { ips: vec!["1.2.3".into()] }).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
        assert_eq!(state.sessions.active().await, 0);
    }

    #[tokio::test]
    async fn test_abandoned_starts_expire() {
        let server = MockServer::start().await;
        mock_all(&server, 20).await;
        let state = state_for(&server, 10).await;

        let mut ids = Vec::new();
        for _ in 0..50 {
            let page = json_of(&start_impl(&state, BatchStartParams { ips: ips(20) }).await.unwrap());
            assert_eq!(page["done"], false);
            ids.push(page["sessionId"].as_u64().unwrap());
        }
        assert_eq!(state.sessions.active().await, 50);

        tokio::time::pause();
        tokio::time::advance(SESSION_IDLE_TTL + Duration::from_secs(1)).await;

        let err = next_impl(&state, BatchNextParams { session_id: ids[49] }).await.unwrap_err();
        assert_eq!(err.code.0, -32004);
        assert_eq!(state.sessions.active().await, 0);
    }

    #[tokio::test]
    async fn test_next_while_loading_is_busy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "success", "country": "Testland"}))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        let state = Arc::new(state_for(&server, 1).await);

        let session_id = state.sessions.reserve();
        let session = Arc::new(state.orchestrator.session(ips(2)));
        state.sessions.register(session_id, session.clone()).await;

        let in_flight = tokio::spawn({
            let state = state.clone();
            async move { next_impl(&state, BatchNextParams { session_id }).await }
        });
        while !session.is_loading() {
            tokio::task::yield_now().await;
        }

        let busy = json_of(&next_impl(&state, BatchNextParams { session_id }).await.unwrap());
        assert_eq!(busy["busy"], true);
        assert_eq!(busy["state"], "loadingChunk");
        assert!(busy.get("chunk").is_none());

        let loaded = json_of(&in_flight.await.unwrap().unwrap());
        assert_eq!(loaded["busy"], false);
        assert_eq!(loaded["loaded"], 1);
    }
}
