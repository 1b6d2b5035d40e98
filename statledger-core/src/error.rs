//! Error types for statledger operations

use crate::state::IngestionStep;
use thiserror::Error;

/// Store-level errors, classified by a `SchemaStore` implementation.
///
/// The classification is what lets the components tell the benign
/// "already exists" race outcome apart from genuine failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{object} already exists")]
    AlreadyExists { object: String },

    #[error("Column {column} does not exist")]
    UndefinedColumn { column: String },

    #[error("Table {table} does not exist")]
    UndefinedTable { table: String },

    #[error("Store operation '{operation}' timed out")]
    Timeout { operation: String },

    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Database error [{code}]: {message}")]
    Database { code: String, message: String },
}

impl StoreError {
    /// True for the duplicate-object outcome of a DDL race.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }
}

/// Failure of one ingestion event.
///
/// Every variant is terminal for the event that produced it; nothing here is
/// retried internally.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("Invalid identifier {key:?}: {reason}")]
    InvalidIdentifier { key: String, reason: String },

    #[error("Invalid record: {reason}")]
    InvalidRecord { reason: String },

    #[error("Schema of table {table} unavailable: {reason}")]
    SchemaUnavailable { table: String, reason: String },

    #[error("Bootstrap of table {table} failed: {reason}")]
    BootstrapFailed { table: String, reason: String },

    #[error("Schema conflict on column {column}: {reason}")]
    SchemaConflict { column: String, reason: String },

    #[error("Write rejected: {reason}")]
    WriteRejected { reason: String },

    #[error("Write failed: {reason}")]
    WriteFailed { reason: String },
}

impl IngestError {
    pub fn invalid_identifier(key: impl Into<String>, reason: impl Into<String>) -> Self {
        IngestError::InvalidIdentifier {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_record(reason: impl Into<String>) -> Self {
        IngestError::InvalidRecord {
            reason: reason.into(),
        }
    }

    /// The step of the ingestion event that failed.
    pub fn phase(&self) -> IngestionStep {
        match self {
            IngestError::InvalidIdentifier { .. } | IngestError::InvalidRecord { .. } => {
                IngestionStep::Validate
            }
            IngestError::BootstrapFailed { .. } => IngestionStep::Bootstrap,
            IngestError::SchemaUnavailable { .. } | IngestError::SchemaConflict { .. } => {
                IngestionStep::Provision
            }
            IngestError::WriteRejected { .. } | IngestError::WriteFailed { .. } => {
                IngestionStep::Write
            }
        }
    }

    /// Whether the caller may reasonably retry the whole event.
    ///
    /// Input errors are permanent for the offending record.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            IngestError::InvalidIdentifier { .. } | IngestError::InvalidRecord { .. }
        )
    }
}

/// Result type alias for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Result type alias for raw store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// TESTS
// =============================================================================
