//! REST API Routes Module
//!
//! - `/api/v1/ingestions`: ingestion events and row read-back
//! - `/api/v1/schema`: live column list
//! - `/health`: liveness and readiness
//! - `/metrics`: Prometheus scrape endpoint

pub mod health;
pub mod ingestion;
pub mod schema;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    routing::get,
    Router,
};
use statledger_storage::Ingestor;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

use crate::config::ApiConfig;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!("CORS: allowing origins: {:?}", config.cors_origins);
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Build the full application router over an ingestion orchestrator.
pub fn create_api_router(ingestor: Arc<Ingestor>, config: &ApiConfig) -> Router {
    let api_routes = Router::new()
        .nest("/ingestions", ingestion::create_router())
        .nest("/schema", schema::create_router());

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health::create_router())
        .route("/metrics", get(metrics_handler))
        .with_state(AppState::new(ingestor))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(from_fn(observability_middleware))
        .layer(build_cors_layer(config))
}
