//! Request and response bodies of the HTTP surface.

use serde::{Deserialize, Serialize};
use statledger_core::StatValues;

/// Body of `POST /api/v1/ingestions`.
///
/// `stats` keeps the key order of the JSON object; columns are written in
/// that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionRequest {
    pub filename: String,
    #[serde(default)]
    pub stats: StatValues,
}

/// Body of `GET /api/v1/schema`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaResponse {
    pub table: String,
    /// Live columns in table order, fixed columns first.
    pub columns: Vec<String>,
}
