//! statledger API - PostgreSQL Store and HTTP Surface
//!
//! Provides the PostgreSQL implementation of the `SchemaStore` trait and an
//! Axum HTTP layer through which the upstream computation layer submits
//! ingestion events. Each request runs one event through the orchestrator
//! in statledger-storage.

pub mod config;
pub mod db;
pub mod error;
pub mod macros;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use config::ApiConfig;
pub use db::{classify_pg_error, DbConfig, PgSchemaStore};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_api_router;
pub use state::AppState;
pub use types::{IngestionRequest, SchemaResponse};
