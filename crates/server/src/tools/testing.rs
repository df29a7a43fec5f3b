//! Shared fixtures for tool tests.

use ipscope_client::{IpApiClient, IpApiConfig};
use ipscope_core::{
    BatchOptions, BatchOrchestrator, DispatchMode, GeoDb, Resolver, ResolverOptions, fast_cache::MokaFastCache,
};
use rmcp::model::CallToolResult;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::state::AppState;

/// Idle lifetime for sessions created by test state.
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(900);

/// State wired to a mock ip-api server with pacing disabled.
pub async fn state_for(server: &MockServer, chunk_size: usize) -> AppState {
    let store = GeoDb::open_in_memory().await.unwrap();
    let client = IpApiClient::new(IpApiConfig { base_url: server.uri(), ..Default::default() }).unwrap();
    let resolver = Arc::new(Resolver::new(
        Arc::new(MokaFastCache::new(1_000)),
        Arc::new(store.clone()),
        Arc::new(client),
        ResolverOptions::default(),
    ));
    let orchestrator = BatchOrchestrator::new(
        resolver.clone(),
        BatchOptions { chunk_size, pacing_delay: Duration::ZERO, mode: DispatchMode::Sequential },
    );
    AppState::new(resolver, orchestrator, store, SESSION_IDLE_TTL)
}

/// Answer `GET /json/{ip}` with a successful lookup.
pub async fn mock_success(server: &MockServer, ip: &str, country: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/json/{ip}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "country": country,
            "query": ip
        })))
        .mount(server)
        .await;
}

/// Answer `GET /json/{ip}` with a failed lookup.
pub async fn mock_fail(server: &MockServer, ip: &str, message: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/json/{ip}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "fail",
            "message": message,
            "query": ip
        })))
        .mount(server)
        .await;
}

/// Parse the JSON text payload of a tool result.
pub fn json_of(result: &CallToolResult) -> serde_json::Value {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
