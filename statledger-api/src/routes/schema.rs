//! Schema read-out route.

use axum::{extract::State, routing::get, Json, Router};
use statledger_storage::Ingestor;
use std::sync::Arc;

use crate::{error::ApiResult, state::AppState, types::SchemaResponse};

/// GET /api/v1/schema - Live column list of the target table
pub async fn get_schema(State(ingestor): State<Arc<Ingestor>>) -> ApiResult<Json<SchemaResponse>> {
    let columns = ingestor.columns().await?;
    Ok(Json(SchemaResponse {
        table: ingestor.table().to_string(),
        columns,
    }))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/", get(get_schema))
}
