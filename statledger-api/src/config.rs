//! API Configuration Module
//!
//! Bind address, request limits and CORS for the HTTP surface. Loaded from
//! environment variables with defaults suitable for development.

use crate::error::{ApiError, ApiResult};
use std::net::SocketAddr;

/// Default cap on an ingestion request body (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Socket the server listens on.
    pub bind_addr: SocketAddr,

    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,

    /// Allowed CORS origins. Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            cors_origins: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `STATLEDGER_API_BIND`: listen host (default: 0.0.0.0)
    /// - `PORT` or `STATLEDGER_API_PORT`: listen port (default: 3000)
    /// - `STATLEDGER_MAX_BODY_BYTES`: request body cap (default: 1 MiB)
    /// - `STATLEDGER_CORS_ORIGINS`: comma-separated allowed origins (empty = allow all)
    ///
    /// An unparsable bind address or port is an error, not a fallback.
    pub fn from_env() -> ApiResult<Self> {
        let bind_addr = resolve_bind_addr()?;

        let max_body_bytes = std::env::var("STATLEDGER_MAX_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_BODY_BYTES);

        let cors_origins = std::env::var("STATLEDGER_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_addr,
            max_body_bytes,
            cors_origins,
        })
    }
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("STATLEDGER_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("STATLEDGER_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
