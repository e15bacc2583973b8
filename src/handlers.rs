use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::db_storage::LeadSink;
use crate::enrichment::EnrichmentOrchestrator;
use crate::errors::AppError;
use crate::models::{BatchRequest, BatchResult};

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Batch driver with its probe and directory clients.
    pub orchestrator: EnrichmentOrchestrator,
    /// Storage collaborator for processed leads (optional).
    pub sink: Option<Arc<dyn LeadSink>>,
}

/// Response for a batch enrichment call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichBatchResponse {
    #[serde(flatten)]
    pub result: BatchResult,
    /// Whether the processed leads reached the storage sink.
    pub persisted: bool,
}

/// Routes that sit behind the request limits.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/enrichment/batches", post(enrich_batch))
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-leads-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/v1/enrichment/batches
///
/// Enriches a batch of raw leads and hands the processed ones to the sink.
///
/// An unreadable envelope (bad JSON, wrongly typed `batchId` or `options`),
/// a missing `batchId` or a non-array `leads` is rejected with 400 before
/// any lead is touched. Otherwise the call always returns 200: per-lead
/// failures are listed in `errors`, and a sink failure is logged and
/// reported as `persisted: false`.
pub async fn enrich_batch(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<EnrichBatchResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!("Rejected batch body: {}", rejection.body_text());
        AppError::Validation(rejection.body_text())
    })?;
    let batch = request.validate()?;
    tracing::info!(
        "POST /enrichment/batches - batch {} with {} lead(s)",
        batch.batch_id,
        batch.leads.len()
    );

    let result = state.orchestrator.enrich_batch(batch).await;

    let persisted = match state.sink {
        Some(ref sink) if !result.processed.is_empty() => match sink.persist(&result).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Failed to persist batch {}: {}", result.batch_id, e);
                false
            }
        },
        _ => false,
    };

    Ok(Json(EnrichBatchResponse { result, persisted }))
}
