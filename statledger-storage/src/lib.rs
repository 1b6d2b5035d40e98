//! statledger Storage - Schema Store Trait and Ingestion Components
//!
//! Defines the store-facing surface the dynamic-schema layer needs (one
//! `CREATE TABLE IF NOT EXISTS`, one column listing, additive `ADD COLUMN`
//! statements, one parameterized insert) and the components built on it:
//!
//! - [`inspector`]: reads the live column set
//! - [`bootstrap`]: ensures the base table exists
//! - [`provisioner`]: diffs required against live columns and adds the rest
//! - [`writer`]: inserts one row
//! - [`orchestrator`]: sequences the above for one ingestion event
//!
//! The PostgreSQL implementation lives in statledger-api.

pub mod bootstrap;
pub mod inspector;
pub mod mock;
pub mod orchestrator;
pub mod provisioner;
pub mod writer;

pub use bootstrap::ensure_table;
pub use inspector::current_columns;
pub use mock::MockStore;
pub use orchestrator::Ingestor;
pub use provisioner::{provision, provision_columns, ProvisionOutcome};
pub use writer::{insert, WriteOutcome};

use async_trait::async_trait;
use statledger_core::{
    ColumnIdentifier, RowId, RowInsert, StoreResult, StoredRow, TableName, Timestamp,
};

// ============================================================================
// SCHEMA STORE TRAIT
// ============================================================================

/// Store operations required by the ingestion components.
///
/// Implementations classify failures into [`statledger_core::StoreError`];
/// in particular a duplicate table/column must surface as
/// `StoreError::AlreadyExists` so races can be told apart from real errors.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Create the table with its fixed columns if it does not exist.
    async fn create_table(&self, table: &TableName) -> StoreResult<()>;

    /// Live column names in table order, or `None` if the table does not exist.
    async fn list_columns(&self, table: &TableName) -> StoreResult<Option<Vec<String>>>;

    /// Add one nullable numeric column.
    async fn add_column(&self, table: &TableName, column: &ColumnIdentifier) -> StoreResult<()>;

    /// Insert exactly one row; returns the assigned id and stored timestamp.
    async fn insert_row(&self, table: &TableName, row: &RowInsert)
        -> StoreResult<(RowId, Timestamp)>;

    /// Read one row back with every dynamic column of the table.
    async fn fetch_row(&self, table: &TableName, id: RowId) -> StoreResult<Option<StoredRow>>;
}
