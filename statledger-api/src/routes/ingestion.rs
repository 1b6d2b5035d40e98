//! Ingestion REST API Routes
//!
//! The upstream computation layer posts one summary record per event; each
//! request is exactly one ingestion event.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use statledger_core::{IngestionReceipt, IngestionStep, RowId, StoredRow, SummaryRecord};
use statledger_storage::Ingestor;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    telemetry::METRICS,
    types::IngestionRequest,
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/ingestions - Persist one summary record as one new row
///
/// Every outcome is counted in the ingestion metrics, including bodies
/// rejected before they reach the orchestrator.
pub async fn create_ingestion(
    State(ingestor): State<Arc<Ingestor>>,
    payload: Result<Json<IngestionRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let start = Instant::now();
    let result = run_ingestion(&ingestor, payload).await;
    let elapsed = start.elapsed().as_secs_f64();

    if let Ok(metrics) = METRICS.as_ref() {
        match &result {
            Ok(receipt) => metrics.record_ingestion_written(receipt.columns_added.len(), elapsed),
            Err(e) => metrics.record_ingestion_failed(
                e.phase().unwrap_or(IngestionStep::Validate.as_str()),
                elapsed,
            ),
        }
    }

    let receipt = result?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn run_ingestion(
    ingestor: &Ingestor,
    payload: Result<Json<IngestionRequest>, JsonRejection>,
) -> ApiResult<IngestionReceipt> {
    let Json(req) = payload?;
    let record = SummaryRecord::new(req.filename, req.stats)?;
    Ok(ingestor.ingest(&record).await?)
}

/// GET /api/v1/ingestions/:id - Read an ingested row back
pub async fn get_ingestion(
    State(ingestor): State<Arc<Ingestor>>,
    Path(id): Path<RowId>,
) -> ApiResult<Json<StoredRow>> {
    let row = ingestor
        .fetch(id)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("Ingestion", id))?;
    Ok(Json(row))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_ingestion))
        .route("/:id", get(get_ingestion))
}
