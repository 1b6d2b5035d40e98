//! statledger Core - Data Types
//!
//! Pure data structures and pure functions shared by every other crate:
//! summary records, column identifiers, SQL statement rendering and the
//! ingestion state machine. Nothing in this crate performs I/O.

use chrono::{DateTime, Utc};

pub mod config;
pub mod error;
pub mod identifier;
pub mod record;
pub mod sql;
pub mod state;

pub use config::LedgerConfig;
pub use error::{IngestError, IngestResult, StoreError, StoreResult};
pub use identifier::{
    fixed_columns, quote_identifier, sanitize, ColumnIdentifier, TableName, FILENAME_COLUMN,
    ID_COLUMN, IDENTIFIER_QUOTE, MAX_IDENTIFIER_BYTES, TIMESTAMP_COLUMN,
};
pub use record::{
    flatten_stat_key, IngestionReceipt, RowInsert, StatValues, StoredRow, SummaryRecord,
};
pub use state::{IngestionPhase, IngestionStep, PhaseTransitionError};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Surrogate row identifier assigned by the store's identity column.
pub type RowId = i64;
