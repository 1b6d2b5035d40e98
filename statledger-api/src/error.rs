//! Error Types for the statledger API
//!
//! - `ErrorCode`: error category, mapped to an HTTP status
//! - `ApiError`: structured JSON error body
//! - conversions from ingestion errors and JSON body rejections
//!
//! A failed ingestion event always answers with an error naming the failed
//! step in `details.phase`; there is no partial-success response.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use statledger_core::{IngestError, IngestionStep};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request contains invalid input data
    InvalidInput,

    /// Request body exceeds the configured limit (413)
    PayloadTooLarge,

    /// Request body is not JSON (415)
    UnsupportedMediaType,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested row does not exist
    EntityNotFound,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    /// Table schema could not be brought in line with the record
    SchemaConflict,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Database operation failed
    DatabaseError,

    /// Service is temporarily unavailable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorCode::EntityNotFound => StatusCode::NOT_FOUND,
            ErrorCode::SchemaConflict => StatusCode::CONFLICT,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::InternalError | ErrorCode::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (failed phase, retryability)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors
    // ========================================================================

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn entity_not_found(entity_type: &str, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityNotFound,
            format!("{} with id {} not found", entity_type, id),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// The ingestion step named in `details.phase`, if any.
    pub fn phase(&self) -> Option<&str> {
        self.details.as_ref()?.get("phase")?.as_str()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

/// Map a failed ingestion event onto the HTTP surface.
impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        let code = match &err {
            IngestError::InvalidIdentifier { .. } | IngestError::InvalidRecord { .. } => {
                ErrorCode::InvalidInput
            }
            IngestError::SchemaConflict { .. } | IngestError::WriteRejected { .. } => {
                ErrorCode::SchemaConflict
            }
            IngestError::SchemaUnavailable { .. } | IngestError::BootstrapFailed { .. } => {
                ErrorCode::ServiceUnavailable
            }
            IngestError::WriteFailed { .. } => ErrorCode::DatabaseError,
        };

        ApiError::new(code, err.to_string()).with_details(serde_json::json!({
            "phase": err.phase(),
            "retryable": err.is_retryable(),
        }))
    }
}

/// A rejected request body fails the event in the validate step; the
/// rejection's own status (413, 415) is kept.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let code = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ErrorCode::PayloadTooLarge,
            StatusCode::UNSUPPORTED_MEDIA_TYPE => ErrorCode::UnsupportedMediaType,
            _ => ErrorCode::InvalidInput,
        };

        ApiError::new(code, format!("Invalid request body: {}", rejection.body_text()))
            .with_details(serde_json::json!({
                "phase": IngestionStep::Validate,
                "retryable": false,
            }))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::InvalidInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::EntityNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::SchemaConflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::DatabaseError.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorCode::ServiceUnavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ErrorCode::PayloadTooLarge.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            ErrorCode::UnsupportedMediaType.status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }

    #[test]
    fn test_ingest_error_mapping() {
        let cases = [
            (
                IngestError::invalid_identifier("", "identifier is empty"),
                ErrorCode::InvalidInput,
                "validate",
            ),
            (
                IngestError::invalid_record("filename is empty"),
                ErrorCode::InvalidInput,
                "validate",
            ),
            (
                IngestError::BootstrapFailed {
                    table: "stats".into(),
                    reason: "permission denied".into(),
                },
                ErrorCode::ServiceUnavailable,
                "bootstrap",
            ),
            (
                IngestError::SchemaUnavailable {
                    table: "stats".into(),
                    reason: "timed out".into(),
                },
                ErrorCode::ServiceUnavailable,
                "provision",
            ),
            (
                IngestError::SchemaConflict {
                    column: "mean_close".into(),
                    reason: "too many columns".into(),
                },
                ErrorCode::SchemaConflict,
                "provision",
            ),
            (
                IngestError::WriteRejected {
                    reason: "column missing".into(),
                },
                ErrorCode::SchemaConflict,
                "write",
            ),
            (
                IngestError::WriteFailed {
                    reason: "connection reset".into(),
                },
                ErrorCode::DatabaseError,
                "write",
            ),
        ];

        for (err, code, phase) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.code, code);
            let details = api.details.unwrap_or_default();
            assert_eq!(details["phase"], phase);
        }
    }

    #[test]
    fn test_phase_accessor() {
        let api: ApiError = IngestError::WriteFailed {
            reason: "connection reset".into(),
        }
        .into();
        assert_eq!(api.phase(), Some("write"));
        assert_eq!(ApiError::invalid_input("bad port").phase(), None);
    }

    #[test]
    fn test_input_errors_are_not_retryable() {
        let api: ApiError = IngestError::invalid_record("filename is empty").into();
        assert_eq!(api.details.unwrap_or_default()["retryable"], false);

        let api: ApiError = IngestError::WriteFailed {
            reason: "connection reset".into(),
        }
        .into();
        assert_eq!(api.details.unwrap_or_default()["retryable"], true);
    }

    #[test]
    fn test_error_serialization() -> Result<(), serde_json::Error> {
        let err = ApiError::from(IngestError::SchemaConflict {
            column: "mean_close".into(),
            reason: "too many columns".into(),
        });
        let json = serde_json::to_string(&err)?;

        assert!(json.contains("SCHEMA_CONFLICT"));
        assert!(json.contains("\"phase\":\"provision\""));

        let deserialized: ApiError = serde_json::from_str(&json)?;
        assert_eq!(deserialized, err);
        Ok(())
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::database_error("Connection failed");
        let display = format!("{}", err);

        assert!(display.contains("DatabaseError"));
        assert!(display.contains("Connection failed"));
    }
}
