//! statledger Telemetry - Logging and Metrics
//!
//! Structured logging through `tracing-subscriber` and Prometheus metrics
//! for ingestion events and HTTP requests.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics_handler, StatledgerMetrics, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{init_tracer, LogFormat, TelemetryConfig};
