//! ipscope server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::{Context, Result};
use ipscope_client::{IpApiClient, IpApiConfig};
use ipscope_core::{AppConfig, BatchOptions, BatchOrchestrator, GeoDb, Resolver, ResolverOptions, fast_cache};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod state;
mod tools;
mod validate;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(
        db_path = %config.db_path.display(),
        api_base_url = %config.api_base_url,
        chunk_size = config.chunk_size,
        pacing_delay_ms = config.pacing_delay_ms,
        dispatch_mode = ?config.dispatch_mode,
        "Starting ipscope server on stdio transport"
    );

    let store = GeoDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening durable store at {}", config.db_path.display()))?;
    let cache = fast_cache::connect(&config).await.context("connecting fast cache")?;
    let client = IpApiClient::new(IpApiConfig::from(&config)).context("building ip-api client")?;

    let resolver = Arc::new(Resolver::new(
        cache,
        Arc::new(store.clone()),
        Arc::new(client),
        ResolverOptions::from_config(&config),
    ));
    let orchestrator = BatchOrchestrator::new(resolver.clone(), BatchOptions::from_config(&config));

    let state = state::AppState::new(resolver, orchestrator, store, config.session_idle_ttl());
    let handler = handler::IpScopeServer::new(state);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    tracing::info!("ipscope server stopped");
    Ok(())
}
