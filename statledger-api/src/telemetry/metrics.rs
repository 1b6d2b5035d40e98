//! Prometheus Metrics Definitions
//!
//! Ingestion and HTTP metrics, exposed on GET /metrics for scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, CounterVec, Encoder,
    HistogramVec, IntCounter, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Ingestion latency buckets (seconds); DDL on a busy table can be slow.
const INGESTION_LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<StatledgerMetrics>> = Lazy::new(StatledgerMetrics::new);

/// Container for all statledger metrics.
#[derive(Clone)]
pub struct StatledgerMetrics {
    /// Ingestion events - labels: status (written/failed), phase
    pub ingestions_total: CounterVec,

    /// Dynamic columns added by this process
    pub columns_added_total: IntCounter,

    /// Ingestion event duration histogram - labels: status
    pub ingestion_duration_seconds: HistogramVec,

    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,
}

impl StatledgerMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            ingestions_total: register_counter_vec!(
                "statledger_ingestions_total",
                "Total number of ingestion events",
                &["status", "phase"]
            )
            .map_err(|e| registration_error("ingestions_total", e))?,

            columns_added_total: register_int_counter!(
                "statledger_columns_added_total",
                "Total number of dynamic columns added"
            )
            .map_err(|e| registration_error("columns_added_total", e))?,

            ingestion_duration_seconds: register_histogram_vec!(
                "statledger_ingestion_duration_seconds",
                "Ingestion event duration in seconds",
                &["status"],
                INGESTION_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("ingestion_duration_seconds", e))?,

            http_requests_total: register_counter_vec!(
                "statledger_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "statledger_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,
        })
    }

    /// Record a written ingestion event.
    pub fn record_ingestion_written(&self, columns_added: usize, duration_secs: f64) {
        self.ingestions_total
            .with_label_values(&["written", "write"])
            .inc();
        self.columns_added_total.inc_by(columns_added as u64);
        self.ingestion_duration_seconds
            .with_label_values(&["written"])
            .observe(duration_secs);
    }

    /// Record a failed ingestion event with the step it failed in.
    pub fn record_ingestion_failed(&self, phase: &str, duration_secs: f64) {
        self.ingestions_total
            .with_label_values(&["failed", phase])
            .inc();
        self.ingestion_duration_seconds
            .with_label_values(&["failed"])
            .observe(duration_secs);
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }
}

fn registration_error(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    // Register ours before the first scrape.
    if let Err(e) = METRICS.as_ref() {
        tracing::error!(error = %e, "Metrics registry unavailable");
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
