//! Schema Inspector: the live column set of the target table.

use crate::SchemaStore;
use statledger_core::{IngestError, IngestResult, TableName};
use std::collections::BTreeSet;

/// Read the current columns of `table`, lower-cased for comparison.
///
/// Never served from a cache: other processes may have widened the table
/// since the last call. Fails with `SchemaUnavailable` if the table is
/// missing or the metadata query errors.
pub async fn current_columns(
    store: &dyn SchemaStore,
    table: &TableName,
) -> IngestResult<BTreeSet<String>> {
    let columns = store
        .list_columns(table)
        .await
        .map_err(|e| {
            tracing::error!(table = %table, error = %e, "Column listing failed");
            IngestError::SchemaUnavailable {
                table: table.to_string(),
                reason: e.to_string(),
            }
        })?
        .ok_or_else(|| IngestError::SchemaUnavailable {
            table: table.to_string(),
            reason: "table does not exist".to_string(),
        })?;

    let columns: BTreeSet<String> = columns.into_iter().map(|c| c.to_lowercase()).collect();
    tracing::debug!(table = %table, count = columns.len(), "Read live columns");
    Ok(columns)
}
