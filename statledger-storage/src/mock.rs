//! In-memory schema store for testing.
//!
//! Mirrors the PostgreSQL behaviors the components depend on: duplicate
//! table/column → `AlreadyExists`, unknown column on insert →
//! `UndefinedColumn`, missing table → `UndefinedTable`. One-shot fault
//! injection covers the failure and race paths.

use crate::SchemaStore;
use async_trait::async_trait;
use statledger_core::{
    fixed_columns, ColumnIdentifier, RowId, RowInsert, StoreError, StoreResult, StoredRow,
    TableName, Timestamp,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

#[derive(Debug, Clone)]
struct MockRow {
    id: RowId,
    filename: String,
    timestamp: Timestamp,
    values: HashMap<String, Option<f64>>,
}

#[derive(Debug, Default)]
struct MockTable {
    columns: Vec<String>,
    rows: Vec<MockRow>,
    next_id: RowId,
}

#[derive(Debug, Default)]
struct Faults {
    create_table: Option<StoreError>,
    list_columns: Option<StoreError>,
    add_column: Option<StoreError>,
    race_add_column: bool,
    insert: Option<StoreError>,
}

/// In-memory mock store.
#[derive(Debug, Default)]
pub struct MockStore {
    tables: RwLock<HashMap<String, MockTable>>,
    faults: Mutex<Faults>,
    add_column_calls: AtomicUsize,
}

fn poisoned() -> StoreError {
    StoreError::Unavailable {
        reason: "mock store lock poisoned".to_string(),
    }
}

impl MockStore {
    /// Create a new mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with an arbitrary column list, bypassing the fixed layout.
    pub fn seed_table(&self, table: &TableName, columns: &[&str]) {
        if let Ok(mut tables) = self.tables.write() {
            tables.insert(
                table.as_str().to_string(),
                MockTable {
                    columns: columns.iter().map(|c| c.to_string()).collect(),
                    rows: Vec::new(),
                    next_id: 1,
                },
            );
        }
    }

    /// Drop a table and its rows, as an operator outside the process would.
    pub fn drop_table(&self, table: &TableName) {
        if let Ok(mut tables) = self.tables.write() {
            tables.remove(table.as_str());
        }
    }

    /// Column names of `table` in table order (empty if it does not exist).
    pub fn columns(&self, table: &TableName) -> Vec<String> {
        self.tables
            .read()
            .ok()
            .and_then(|tables| tables.get(table.as_str()).map(|t| t.columns.clone()))
            .unwrap_or_default()
    }

    /// Number of rows in `table`.
    pub fn row_count(&self, table: &TableName) -> usize {
        self.tables
            .read()
            .ok()
            .and_then(|tables| tables.get(table.as_str()).map(|t| t.rows.len()))
            .unwrap_or(0)
    }

    /// Number of `add_column` calls that reached the store.
    pub fn add_column_calls(&self) -> usize {
        self.add_column_calls.load(Ordering::SeqCst)
    }

    /// Make the next `create_table` call fail with `err`.
    pub fn fail_next_create_table(&self, err: StoreError) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.create_table = Some(err);
        }
    }

    /// Make the next `list_columns` call fail with `err`.
    pub fn fail_next_list_columns(&self, err: StoreError) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.list_columns = Some(err);
        }
    }

    /// Make the next `add_column` call fail with `err` without touching the schema.
    pub fn fail_next_add_column(&self, err: StoreError) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.add_column = Some(err);
        }
    }

    /// Simulate a concurrent writer: the next `add_column` call finds its
    /// column created by someone else and reports `AlreadyExists`.
    pub fn race_next_add_column(&self) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.race_add_column = true;
        }
    }

    /// Make the next `insert_row` call fail with `err`.
    pub fn fail_next_insert(&self, err: StoreError) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.insert = Some(err);
        }
    }

    fn take_fault(&self, pick: impl FnOnce(&mut Faults) -> Option<StoreError>) -> StoreResult<()> {
        let mut faults = self.faults.lock().map_err(|_| poisoned())?;
        match pick(&mut faults) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SchemaStore for MockStore {
    async fn create_table(&self, table: &TableName) -> StoreResult<()> {
        tokio::task::yield_now().await;
        self.take_fault(|f| f.create_table.take())?;

        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        tables.entry(table.as_str().to_string()).or_insert_with(|| MockTable {
            columns: fixed_columns().iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
            next_id: 1,
        });
        Ok(())
    }

    async fn list_columns(&self, table: &TableName) -> StoreResult<Option<Vec<String>>> {
        tokio::task::yield_now().await;
        self.take_fault(|f| f.list_columns.take())?;

        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.get(table.as_str()).map(|t| t.columns.clone()))
    }

    async fn add_column(&self, table: &TableName, column: &ColumnIdentifier) -> StoreResult<()> {
        tokio::task::yield_now().await;
        self.add_column_calls.fetch_add(1, Ordering::SeqCst);
        self.take_fault(|f| f.add_column.take())?;
        let raced = self
            .faults
            .lock()
            .map(|mut f| std::mem::take(&mut f.race_add_column))
            .map_err(|_| poisoned())?;

        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let entry = tables
            .get_mut(table.as_str())
            .ok_or_else(|| StoreError::UndefinedTable {
                table: table.to_string(),
            })?;

        let exists = entry.columns.iter().any(|c| c == column.as_str());
        if raced && !exists {
            entry.columns.push(column.as_str().to_string());
        }
        if raced || exists {
            return Err(StoreError::AlreadyExists {
                object: format!("column {}", column.quoted()),
            });
        }

        entry.columns.push(column.as_str().to_string());
        Ok(())
    }

    async fn insert_row(
        &self,
        table: &TableName,
        row: &RowInsert,
    ) -> StoreResult<(RowId, Timestamp)> {
        tokio::task::yield_now().await;
        self.take_fault(|f| f.insert.take())?;

        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let entry = tables
            .get_mut(table.as_str())
            .ok_or_else(|| StoreError::UndefinedTable {
                table: table.to_string(),
            })?;

        if let Some(missing) = row
            .stat_columns()
            .find(|c| !entry.columns.iter().any(|existing| existing == c.as_str()))
        {
            return Err(StoreError::UndefinedColumn {
                column: missing.to_string(),
            });
        }

        let id = entry.next_id;
        entry.next_id += 1;
        entry.rows.push(MockRow {
            id,
            filename: row.filename.clone(),
            timestamp: row.timestamp,
            values: row
                .values
                .iter()
                .map(|(c, v)| (c.as_str().to_string(), *v))
                .collect(),
        });
        Ok((id, row.timestamp))
    }

    async fn fetch_row(&self, table: &TableName, id: RowId) -> StoreResult<Option<StoredRow>> {
        tokio::task::yield_now().await;

        let tables = self.tables.read().map_err(|_| poisoned())?;
        let entry = tables
            .get(table.as_str())
            .ok_or_else(|| StoreError::UndefinedTable {
                table: table.to_string(),
            })?;

        let fixed = fixed_columns();
        Ok(entry.rows.iter().find(|r| r.id == id).map(|r| {
            let values: BTreeMap<String, Option<f64>> = entry
                .columns
                .iter()
                .filter(|c| !fixed.iter().any(|f| f.as_str() == c.as_str()))
                .map(|c| (c.clone(), r.values.get(c).copied().flatten()))
                .collect();
            StoredRow {
                id: r.id,
                filename: r.filename.clone(),
                timestamp: r.timestamp,
                values,
            }
        }))
    }
}
