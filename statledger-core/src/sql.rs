//! SQL statement rendering for PostgreSQL.
//!
//! Identifiers are embedded in quoted form only; values never appear in the
//! text and are always bound as `$n` parameters.

use crate::identifier::{
    quote_identifier, ColumnIdentifier, TableName, FILENAME_COLUMN, ID_COLUMN, TIMESTAMP_COLUMN,
};

/// Column type of every dynamic stat column.
pub const STAT_COLUMN_TYPE: &str = "DOUBLE PRECISION";

/// Live column names of a table in the current schema. `$1` is the table name.
pub const LIST_COLUMNS_SQL: &str = "SELECT column_name::text FROM information_schema.columns \
     WHERE table_schema = current_schema() AND table_name::text = $1 \
     ORDER BY ordinal_position";

/// `CREATE TABLE IF NOT EXISTS` with the fixed identity/audit columns only.
pub fn create_table_sql(table: &TableName) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\
         {} BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY, \
         {} TEXT NOT NULL, \
         {} TIMESTAMPTZ NOT NULL)",
        table.quoted(),
        quote_identifier(ID_COLUMN),
        quote_identifier(FILENAME_COLUMN),
        quote_identifier(TIMESTAMP_COLUMN),
    )
}

/// Additive, nullable column for one statistic.
pub fn add_column_sql(table: &TableName, column: &ColumnIdentifier) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {} {} NULL",
        table.quoted(),
        column.quoted(),
        STAT_COLUMN_TYPE
    )
}

/// Parameterized insert: `$1` filename, `$2` timestamp, then one parameter per
/// stat column in the given order. Returns the new row's id and timestamp.
pub fn insert_sql<'a, I>(table: &TableName, stat_columns: I) -> String
where
    I: IntoIterator<Item = &'a ColumnIdentifier>,
{
    let mut columns = vec![
        quote_identifier(FILENAME_COLUMN),
        quote_identifier(TIMESTAMP_COLUMN),
    ];
    columns.extend(stat_columns.into_iter().map(ColumnIdentifier::quoted));

    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}, {}",
        table.quoted(),
        columns.join(", "),
        placeholders.join(", "),
        quote_identifier(ID_COLUMN),
        quote_identifier(TIMESTAMP_COLUMN),
    )
}

/// Select one row by id with the fixed columns first, then `stat_columns`.
pub fn select_row_sql<'a, I>(table: &TableName, stat_columns: I) -> String
where
    I: IntoIterator<Item = &'a ColumnIdentifier>,
{
    let mut columns = vec![
        quote_identifier(ID_COLUMN),
        quote_identifier(FILENAME_COLUMN),
        quote_identifier(TIMESTAMP_COLUMN),
    ];
    columns.extend(stat_columns.into_iter().map(ColumnIdentifier::quoted));

    format!(
        "SELECT {} FROM {} WHERE {} = $1",
        columns.join(", "),
        table.quoted(),
        quote_identifier(ID_COLUMN),
    )
}
