//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use statledger_storage::Ingestor;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Orchestrator for the configured table; holds the session's bootstrap flag.
    pub ingestor: Arc<Ingestor>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(ingestor: Arc<Ingestor>) -> Self {
        Self {
            ingestor,
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(Arc<Ingestor>, ingestor);
crate::impl_from_ref!(Instant, start_time);
