//! Database Connection Pool Module
//!
//! PostgreSQL implementation of [`SchemaStore`] over a deadpool-postgres pool.
//! Every statement is rendered by `statledger_core::sql`; identifiers reach
//! the text only in quoted form and values are always bound parameters.
//!
//! Driver errors are classified by SQLSTATE into [`StoreError`] so that the
//! ingestion components can tell a benign "already exists" race apart from a
//! real failure. Every pool wait and statement is bounded by the configured
//! timeout.

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use statledger_core::sql::{
    add_column_sql, create_table_sql, insert_sql, select_row_sql, LIST_COLUMNS_SQL,
};
use statledger_core::{
    ColumnIdentifier, RowId, RowInsert, StoreError, StoreResult, StoredRow, TableName, Timestamp,
};
use statledger_storage::SchemaStore;
use std::future::Future;
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Bound on pool waits and on every store call
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "statledger".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("STATLEDGER_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("STATLEDGER_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("STATLEDGER_DB_NAME")
                .unwrap_or_else(|_| "statledger".to_string()),
            user: std::env::var("STATLEDGER_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("STATLEDGER_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("STATLEDGER_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("STATLEDGER_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.pool = Some(PoolConfig::new(self.max_size));

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// ERROR CLASSIFICATION
// ============================================================================

/// Classify a driver error by SQLSTATE.
pub fn classify_pg_error(err: &tokio_postgres::Error) -> StoreError {
    let Some(db_error) = err.as_db_error() else {
        return StoreError::Unavailable {
            reason: err.to_string(),
        };
    };

    let code = db_error.code();
    let message = db_error.message();

    if code == &SqlState::DUPLICATE_COLUMN
        || code == &SqlState::DUPLICATE_TABLE
        || code == &SqlState::UNIQUE_VIOLATION
    {
        // 23505 is what a concurrent CREATE TABLE loses with (pg_type catalog).
        StoreError::AlreadyExists {
            object: message
                .strip_suffix(" already exists")
                .unwrap_or(message)
                .to_string(),
        }
    } else if code == &SqlState::UNDEFINED_COLUMN {
        StoreError::UndefinedColumn {
            column: first_quoted(message).unwrap_or(message).to_string(),
        }
    } else if code == &SqlState::UNDEFINED_TABLE {
        StoreError::UndefinedTable {
            table: first_quoted(message).unwrap_or(message).to_string(),
        }
    } else {
        StoreError::Database {
            code: code.code().to_string(),
            message: message.to_string(),
        }
    }
}

/// Classify a pool checkout failure.
pub fn classify_pool_error(err: deadpool_postgres::PoolError) -> StoreError {
    match err {
        deadpool_postgres::PoolError::Timeout(_) => StoreError::Timeout {
            operation: "acquire connection".to_string(),
        },
        deadpool_postgres::PoolError::Backend(e) => classify_pg_error(&e),
        other => StoreError::Unavailable {
            reason: other.to_string(),
        },
    }
}

/// The name inside the first pair of double quotes of a server message,
/// e.g. `mean_close` from `column "mean_close" of relation "t" does not exist`.
fn first_quoted(message: &str) -> Option<&str> {
    let start = message.find('"')? + 1;
    let len = message[start..].find('"')?;
    Some(&message[start..start + len])
}

// ============================================================================
// SCHEMA STORE
// ============================================================================

/// PostgreSQL schema store backed by a connection pool.
#[derive(Clone)]
pub struct PgSchemaStore {
    pool: Pool,
    timeout: Duration,
}

impl PgSchemaStore {
    pub fn new(pool: Pool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Create a new store from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool, config.timeout))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        let status = self.pool.status();
        status.size
    }

    /// Round-trip a trivial query.
    pub async fn health_check(&self) -> StoreResult<()> {
        let conn = self.get_conn().await?;
        self.bounded("health_check", conn.simple_query("SELECT 1"))
            .await
            .map(|_| ())
    }

    async fn get_conn(&self) -> StoreResult<deadpool_postgres::Object> {
        match tokio::time::timeout(self.timeout, self.pool.get()).await {
            Ok(result) => result.map_err(classify_pool_error),
            Err(_) => Err(StoreError::Timeout {
                operation: "acquire connection".to_string(),
            }),
        }
    }

    /// Run one driver call under the store timeout and classify its error.
    async fn bounded<T, F>(&self, operation: &str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = Result<T, tokio_postgres::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| {
                let classified = classify_pg_error(&e);
                tracing::debug!(operation, error = %classified, "Statement failed");
                classified
            }),
            Err(_) => Err(StoreError::Timeout {
                operation: operation.to_string(),
            }),
        }
    }
}

fn row_error(e: tokio_postgres::Error) -> StoreError {
    StoreError::Database {
        code: "XX000".to_string(),
        message: format!("Unexpected row shape: {}", e),
    }
}

#[async_trait]
impl SchemaStore for PgSchemaStore {
    async fn create_table(&self, table: &TableName) -> StoreResult<()> {
        let conn = self.get_conn().await?;
        let sql = create_table_sql(table);
        self.bounded("create_table", conn.batch_execute(&sql)).await
    }

    async fn list_columns(&self, table: &TableName) -> StoreResult<Option<Vec<String>>> {
        let conn = self.get_conn().await?;
        let rows = self
            .bounded("list_columns", conn.query(LIST_COLUMNS_SQL, &[&table.as_str()]))
            .await?;

        if rows.is_empty() {
            return Ok(None);
        }
        let columns = rows
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<Vec<_>, _>>()
            .map_err(row_error)?;
        Ok(Some(columns))
    }

    async fn add_column(&self, table: &TableName, column: &ColumnIdentifier) -> StoreResult<()> {
        let conn = self.get_conn().await?;
        let sql = add_column_sql(table, column);
        self.bounded("add_column", conn.batch_execute(&sql)).await
    }

    async fn insert_row(
        &self,
        table: &TableName,
        row: &RowInsert,
    ) -> StoreResult<(RowId, Timestamp)> {
        let conn = self.get_conn().await?;
        let sql = insert_sql(table, row.stat_columns());

        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(row.values.len() + 2);
        params.push(&row.filename);
        params.push(&row.timestamp);
        for (_, value) in &row.values {
            params.push(value);
        }

        let inserted = self
            .bounded("insert_row", conn.query_one(sql.as_str(), &params))
            .await?;
        let id: RowId = inserted.try_get(0).map_err(row_error)?;
        let timestamp: Timestamp = inserted.try_get(1).map_err(row_error)?;
        Ok((id, timestamp))
    }

    async fn fetch_row(&self, table: &TableName, id: RowId) -> StoreResult<Option<StoredRow>> {
        let columns = self
            .list_columns(table)
            .await?
            .ok_or_else(|| StoreError::UndefinedTable {
                table: table.to_string(),
            })?;

        // Only columns whose live name is already canonical can be addressed.
        let stat_columns: Vec<ColumnIdentifier> = columns
            .into_iter()
            .filter_map(|name| {
                ColumnIdentifier::try_from(name.clone())
                    .ok()
                    .filter(|c| c.as_str() == name && !c.is_fixed())
            })
            .collect();

        let conn = self.get_conn().await?;
        let sql = select_row_sql(table, &stat_columns);
        let row = self
            .bounded("fetch_row", conn.query_opt(sql.as_str(), &[&id]))
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut values = std::collections::BTreeMap::new();
        for (offset, column) in stat_columns.iter().enumerate() {
            let value: Option<f64> = row.try_get(offset + 3).map_err(row_error)?;
            values.insert(column.to_string(), value);
        }

        Ok(Some(StoredRow {
            id: row.try_get(0).map_err(row_error)?,
            filename: row.try_get(1).map_err(row_error)?,
            timestamp: row.try_get(2).map_err(row_error)?,
            values,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_quoted() {
        assert_eq!(
            first_quoted("column \"mean_close\" of relation \"stats\" does not exist"),
            Some("mean_close")
        );
        assert_eq!(first_quoted("relation \"stats\" does not exist"), Some("stats"));
        assert_eq!(first_quoted("no quotes here"), None);
        assert_eq!(first_quoted("dangling \"quote"), None);
    }

    #[test]
    fn test_db_config_default() {
        let config = DbConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "statledger");
        assert_eq!(config.max_size, 16);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_closed_pool_is_unavailable() {
        let err = classify_pool_error(deadpool_postgres::PoolError::Closed);
        assert!(matches!(err, StoreError::Unavailable { .. }));
    }
}
