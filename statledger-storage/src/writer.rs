//! Record Writer.

use crate::SchemaStore;
use statledger_core::{
    ColumnIdentifier, IngestError, IngestResult, RowId, RowInsert, StoreError, SummaryRecord,
    TableName, Timestamp,
};

/// Result of a successful insert.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub id: RowId,
    pub timestamp: Timestamp,
    /// Stat columns in statement order.
    pub columns: Vec<ColumnIdentifier>,
}

/// Insert `record` as one new row stamped with `timestamp`.
///
/// Column order is `filename`, `timestamp`, then stat columns in the order
/// supplied. Re-ingesting a filename creates another row; nothing is updated.
/// A column missing at execution time is `WriteRejected`, any other store
/// failure is `WriteFailed`.
pub async fn insert(
    store: &dyn SchemaStore,
    table: &TableName,
    record: &SummaryRecord,
    timestamp: Timestamp,
) -> IngestResult<WriteOutcome> {
    let row = RowInsert::build(record, timestamp)?;

    let (id, timestamp) = store.insert_row(table, &row).await.map_err(|e| {
        tracing::error!(table = %table, filename = %row.filename, error = %e, "Insert failed");
        match e {
            StoreError::UndefinedColumn { .. } | StoreError::UndefinedTable { .. } => {
                IngestError::WriteRejected {
                    reason: e.to_string(),
                }
            }
            other => IngestError::WriteFailed {
                reason: other.to_string(),
            },
        }
    })?;

    tracing::debug!(table = %table, id, columns = row.values.len(), "Row inserted");
    Ok(WriteOutcome {
        id,
        timestamp,
        columns: row.stat_columns().cloned().collect(),
    })
}
