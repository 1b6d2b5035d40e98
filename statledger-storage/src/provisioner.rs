//! Column Provisioner.
//!
//! The only place that widens the table. Columns are added one statement at
//! a time, never removed, renamed or retyped. No lock is held between the
//! column read and the DDL; a concurrent writer adding the same column first
//! is reconciled by treating "already exists" as success and re-reading the
//! live schema afterwards.

use crate::inspector::current_columns;
use crate::SchemaStore;
use statledger_core::{sanitize, ColumnIdentifier, IngestError, IngestResult, TableName};
use std::collections::HashSet;

/// What one provisioning pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionOutcome {
    /// Columns this pass added, in the order they were added.
    pub added: Vec<ColumnIdentifier>,
    /// Columns that were missing at read time but created by a concurrent writer.
    pub raced: Vec<ColumnIdentifier>,
}

impl ProvisionOutcome {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.raced.is_empty()
    }
}

/// Provision columns for raw statistic keys.
///
/// Every key is sanitized first; one invalid key fails the whole call before
/// any DDL runs.
pub async fn provision<'a, I>(
    store: &dyn SchemaStore,
    table: &TableName,
    required_keys: I,
) -> IngestResult<ProvisionOutcome>
where
    I: IntoIterator<Item = &'a str>,
{
    let columns = required_keys
        .into_iter()
        .map(sanitize)
        .collect::<IngestResult<Vec<_>>>()?;
    provision_columns(store, table, &columns).await
}

/// Provision already-sanitized columns.
pub async fn provision_columns(
    store: &dyn SchemaStore,
    table: &TableName,
    required: &[ColumnIdentifier],
) -> IngestResult<ProvisionOutcome> {
    let existing = current_columns(store, table).await?;

    let mut seen = HashSet::new();
    let missing: Vec<&ColumnIdentifier> = required
        .iter()
        .filter(|c| !existing.contains(c.as_str()))
        .filter(|c| seen.insert(c.as_str()))
        .collect();

    let mut outcome = ProvisionOutcome::default();
    if missing.is_empty() {
        return Ok(outcome);
    }

    for column in missing {
        match store.add_column(table, column).await {
            Ok(()) => {
                tracing::info!(table = %table, column = %column, "Added column");
                outcome.added.push(column.clone());
            }
            Err(e) if e.is_already_exists() => {
                tracing::warn!(
                    table = %table,
                    column = %column,
                    "Column added concurrently, continuing"
                );
                outcome.raced.push(column.clone());
            }
            Err(e) => {
                tracing::error!(table = %table, column = %column, error = %e, "Add column failed");
                return Err(IngestError::SchemaConflict {
                    column: column.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let live = current_columns(store, table).await?;
    if let Some(absent) = required.iter().find(|c| !live.contains(c.as_str())) {
        return Err(IngestError::SchemaConflict {
            column: absent.to_string(),
            reason: "column still missing after provisioning".to_string(),
        });
    }

    Ok(outcome)
}
