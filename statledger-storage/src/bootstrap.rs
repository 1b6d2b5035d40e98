//! Table Bootstrapper.

use crate::SchemaStore;
use statledger_core::{fixed_columns, IngestError, IngestResult, TableName};

/// Ensure the base table exists with its fixed identity/audit columns.
///
/// Idempotent. A concurrent creator winning the race surfaces from the store
/// as "already exists" and is treated as success. An existing table that
/// lacks any fixed column is not ours to repair and fails the bootstrap.
pub async fn ensure_table(store: &dyn SchemaStore, table: &TableName) -> IngestResult<()> {
    let failed = |reason: String| IngestError::BootstrapFailed {
        table: table.to_string(),
        reason,
    };

    match store.create_table(table).await {
        Ok(()) => {}
        Err(e) if e.is_already_exists() => {
            tracing::warn!(table = %table, "Table created concurrently, continuing");
        }
        Err(e) => {
            tracing::error!(table = %table, error = %e, "Table bootstrap failed");
            return Err(failed(e.to_string()));
        }
    }

    let columns = store
        .list_columns(table)
        .await
        .map_err(|e| failed(e.to_string()))?
        .ok_or_else(|| failed("table missing after create".to_string()))?;

    let fixed = fixed_columns();
    let missing: Vec<&str> = fixed
        .iter()
        .map(|c| c.as_str())
        .filter(|name| !columns.iter().any(|c| c.eq_ignore_ascii_case(name)))
        .collect();
    if !missing.is_empty() {
        return Err(failed(format!(
            "existing table lacks fixed columns: {}",
            missing.join(", ")
        )));
    }

    tracing::debug!(table = %table, "Table bootstrapped");
    Ok(())
}
