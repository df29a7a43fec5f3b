//! ip_batch_lookup tool implementation.
//!
//! Resolves a list of IPv4 addresses in chunks with pacing. A failing
//! address yields a placeholder record and does not stop the batch.

use ipscope_core::{BatchOrchestrator, Error, GeoRecord, Source};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::validate;

/// Parameters for the ip_batch_lookup tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IpBatchLookupParams {
    /// IPv4 addresses to resolve, in the order results should be returned.
    pub ips: Vec<String>,
}

/// Batch summary statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Records with `status=success`.
    pub succeeded: usize,
    /// Failed lookups and placeholders.
    pub failed: usize,
    /// Records served by the fast cache or durable store.
    pub from_cache: usize,
}

impl BatchSummary {
    pub fn of(records: &[GeoRecord]) -> Self {
        records.iter().fold(Self::default(), |mut summary, record| {
            if record.is_success() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            if matches!(record.source, Some(Source::FastCache | Source::DurableStore)) {
                summary.from_cache += 1;
            }
            summary
        })
    }
}

/// Output from the ip_batch_lookup tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct IpBatchLookupOutput {
    pub results: Vec<GeoRecord>,
    pub total: usize,
    pub summary: BatchSummary,
}

/// Implementation of the ip_batch_lookup tool.
pub async fn batch_impl(
    orchestrator: &BatchOrchestrator, params: IpBatchLookupParams,
) -> Result<CallToolResult, McpError> {
    let ips = validate::ipv4_list(&params.ips)?;

    tracing::info!(total = ips.len(), "batch lookup started");
    let results = orchestrator.resolve_batch(&ips).await;
    let summary = BatchSummary::of(&results);
    tracing::info!(
        total = results.len(),
        succeeded = summary.succeeded,
        failed = summary.failed,
        from_cache = summary.from_cache,
        "batch lookup finished"
    );

    let output = IpBatchLookupOutput { total: results.len(), results, summary };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
