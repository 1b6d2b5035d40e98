//! statledger API Server Entry Point
//!
//! Loads configuration, connects the PostgreSQL pool and starts the Axum
//! HTTP server.

use std::sync::Arc;

use axum::Router;
use statledger_api::telemetry::{init_tracer, TelemetryConfig};
use statledger_api::{create_api_router, ApiConfig, ApiError, ApiResult, DbConfig, PgSchemaStore};
use statledger_core::LedgerConfig;
use statledger_storage::Ingestor;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracer(&telemetry_config)?;

    let api_config = ApiConfig::from_env()?;
    let ledger_config = LedgerConfig::from_env()?;
    let db_config = DbConfig::from_env();

    let store = Arc::new(PgSchemaStore::from_config(&db_config)?);
    match store.health_check().await {
        Ok(()) => tracing::info!(
            host = %db_config.host,
            dbname = %db_config.dbname,
            pool_size = store.pool_size(),
            "Database reachable"
        ),
        // Not fatal: /health/ready reports it and the first event retries.
        Err(e) => tracing::warn!(error = %e, "Database not reachable at startup"),
    }

    let ingestor = Arc::new(Ingestor::new(store, &ledger_config));
    let app: Router = create_api_router(ingestor, &api_config);

    let addr = api_config.bind_addr;
    tracing::info!(%addr, table = %ledger_config.table, "Starting statledger API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
