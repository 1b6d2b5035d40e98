//! Summary records and their persisted forms.

use crate::error::{IngestError, IngestResult};
use crate::identifier::{sanitize, ColumnIdentifier};
use crate::{RowId, Timestamp};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Join a statistic name and a series label into a flat key,
/// e.g. `("mean", "Close")` → `"mean_Close"`.
pub fn flatten_stat_key(statistic: &str, series: &str) -> String {
    format!("{}_{}", statistic, series)
}

// ============================================================================
// STAT VALUES
// ============================================================================

/// Insertion-ordered mapping from statistic key to value.
///
/// Order is preserved end to end: the Record Writer emits stat columns in the
/// order they were inserted here (or appeared in the JSON object).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatValues {
    entries: Vec<(String, f64)>,
}

impl StatValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. An existing key keeps its position and has its value
    /// replaced; the previous value is returned.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) -> Option<f64> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flatten a per-series descriptive-statistics table.
    ///
    /// `table` yields `(series_label, [(statistic, value), ..])`; the result is
    /// series-major, with keys built by [`flatten_stat_key`].
    pub fn from_described<S, T, I, R>(table: I) -> Self
    where
        S: AsRef<str>,
        T: AsRef<str>,
        R: IntoIterator<Item = (T, f64)>,
        I: IntoIterator<Item = (S, R)>,
    {
        let mut values = StatValues::new();
        for (series, row) in table {
            for (statistic, value) in row {
                values.insert(
                    flatten_stat_key(statistic.as_ref(), series.as_ref()),
                    value,
                );
            }
        }
        values
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for StatValues {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut values = StatValues::new();
        for (k, v) in iter {
            values.insert(k, v);
        }
        values
    }
}

impl Serialize for StatValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct StatValuesVisitor;

impl<'de> Visitor<'de> for StatValuesVisitor {
    type Value = StatValues;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of statistic keys to numbers")
    }

    /// JSON has no NaN/Infinity; a `null` value stands for one and is kept
    /// as NaN, which the writer stores as NULL.
    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut values = StatValues::new();
        while let Some((key, value)) = access.next_entry::<String, Option<f64>>()? {
            values.insert(key, value.unwrap_or(f64::NAN));
        }
        Ok(values)
    }
}

impl<'de> Deserialize<'de> for StatValues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(StatValuesVisitor)
    }
}

// ============================================================================
// SUMMARY RECORD
// ============================================================================

/// One ingestion event as handed over by the upstream collaborator.
///
/// The ingestion timestamp is not part of the record; it is stamped by the
/// Record Writer at write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSummaryRecord")]
pub struct SummaryRecord {
    filename: String,
    stats: StatValues,
}

#[derive(Deserialize)]
struct RawSummaryRecord {
    filename: String,
    #[serde(default)]
    stats: StatValues,
}

impl TryFrom<RawSummaryRecord> for SummaryRecord {
    type Error = IngestError;

    fn try_from(raw: RawSummaryRecord) -> Result<Self, Self::Error> {
        SummaryRecord::new(raw.filename, raw.stats)
    }
}

impl SummaryRecord {
    pub fn new(filename: impl Into<String>, stats: StatValues) -> IngestResult<Self> {
        let filename = filename.into();
        if filename.trim().is_empty() {
            return Err(IngestError::invalid_record("filename must not be empty"));
        }
        Ok(Self { filename, stats })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn stats(&self) -> &StatValues {
        &self.stats
    }

    /// Sanitized stat columns in supplied order.
    ///
    /// Fails if a key is invalid or if two keys collapse onto the same
    /// column after normalization.
    pub fn stat_columns(&self) -> IngestResult<Vec<ColumnIdentifier>> {
        let mut seen = HashSet::with_capacity(self.stats.len());
        let mut columns = Vec::with_capacity(self.stats.len());
        for key in self.stats.keys() {
            let column = sanitize(key)?;
            if !seen.insert(column.clone()) {
                return Err(IngestError::invalid_record(format!(
                    "statistic key {:?} collides with another key as column {}",
                    key, column
                )));
            }
            columns.push(column);
        }
        Ok(columns)
    }
}

// ============================================================================
// ROW INSERT
// ============================================================================

/// A fully validated row, ready for the store.
///
/// Stat values are already paired with their sanitized columns; non-finite
/// values have become `None` and persist as SQL NULL.
#[derive(Debug, Clone, PartialEq)]
pub struct RowInsert {
    pub filename: String,
    pub timestamp: Timestamp,
    pub values: Vec<(ColumnIdentifier, Option<f64>)>,
}

impl RowInsert {
    pub fn build(record: &SummaryRecord, timestamp: Timestamp) -> IngestResult<Self> {
        let columns = record.stat_columns()?;
        let values = columns
            .into_iter()
            .zip(record.stats.iter())
            .map(|(column, (_, value))| (column, value.is_finite().then_some(value)))
            .collect();

        Ok(Self {
            filename: record.filename.clone(),
            timestamp,
            values,
        })
    }

    /// Stat columns in statement order.
    pub fn stat_columns(&self) -> impl Iterator<Item = &ColumnIdentifier> {
        self.values.iter().map(|(c, _)| c)
    }
}

// ============================================================================
// PERSISTED FORMS
// ============================================================================

/// Outcome of a successful ingestion event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionReceipt {
    pub id: RowId,
    pub filename: String,
    pub ingested_at: Timestamp,
    /// Columns this event had to provision.
    pub columns_added: Vec<String>,
    /// Stat columns the row was written with, in statement order.
    pub columns_written: Vec<String>,
}

/// A row read back from the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRow {
    pub id: RowId,
    pub filename: String,
    pub timestamp: Timestamp,
    /// Every dynamic column of the table; `None` for NULL.
    pub values: BTreeMap<String, Option<f64>>,
}

impl StoredRow {
    /// Look a value up by statistic key (sanitized the same way as on write).
    ///
    /// Outer `None`: no such column. Inner `None`: the column is NULL.
    pub fn value(&self, key: &str) -> Option<Option<f64>> {
        let column = sanitize(key).ok()?;
        self.values.get(column.as_str()).copied()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_stat_values_preserve_insertion_order() {
        let mut stats = StatValues::new();
        stats.insert("std_Close", 3.2);
        stats.insert("mean_Close", 101.5);
        stats.insert("count_Close", 20.0);

        let keys: Vec<&str> = stats.keys().collect();
        assert_eq!(keys, vec!["std_Close", "mean_Close", "count_Close"]);
    }

    #[test]
    fn test_stat_values_insert_replaces_in_place() {
        let mut stats = StatValues::new();
        stats.insert("a", 1.0);
        stats.insert("b", 2.0);
        assert_eq!(stats.insert("a", 5.0), Some(1.0));

        let pairs: Vec<(&str, f64)> = stats.iter().collect();
        assert_eq!(pairs, vec![("a", 5.0), ("b", 2.0)]);
    }

    #[test]
    fn test_stat_values_json_keeps_document_order() {
        let stats: StatValues =
            serde_json::from_str(r#"{"z_last": 1.0, "a_first": 2.5, "m_mid": -3}"#).unwrap();
        let keys: Vec<&str> = stats.keys().collect();
        assert_eq!(keys, vec!["z_last", "a_first", "m_mid"]);
        assert_eq!(stats.get("m_mid"), Some(-3.0));

        let json = serde_json::to_string(&stats).unwrap();
        assert_eq!(json, r#"{"z_last":1.0,"a_first":2.5,"m_mid":-3.0}"#);
    }

    #[test]
    fn test_stat_values_reject_non_numbers() {
        assert!(serde_json::from_str::<StatValues>(r#"{"mean_Close": "high"}"#).is_err());
    }

    #[test]
    fn test_stat_values_null_becomes_nan() {
        let values: StatValues =
            serde_json::from_str(r#"{"mean_Close": 5.0, "std_Close": null}"#).unwrap();
        assert_eq!(values.keys().collect::<Vec<_>>(), vec!["mean_Close", "std_Close"]);
        assert_eq!(values.get("mean_Close"), Some(5.0));
        assert!(values.get("std_Close").is_some_and(f64::is_nan));
    }

    #[test]
    fn test_from_described_is_series_major() {
        let table = vec![
            ("Close", vec![("mean", 101.5), ("std", 3.2)]),
            ("Volume", vec![("mean", 1000.0)]),
        ];
        let stats = StatValues::from_described(table);
        let keys: Vec<&str> = stats.keys().collect();
        assert_eq!(keys, vec!["mean_Close", "std_Close", "mean_Volume"]);
    }

    #[test]
    fn test_summary_record_rejects_empty_filename() {
        assert!(matches!(
            SummaryRecord::new("  ", StatValues::new()),
            Err(IngestError::InvalidRecord { .. })
        ));

        let err = serde_json::from_str::<SummaryRecord>(r#"{"filename": "", "stats": {}}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_summary_record_deserialize_without_stats() {
        let record: SummaryRecord = serde_json::from_str(r#"{"filename": "a.csv"}"#).unwrap();
        assert_eq!(record.filename(), "a.csv");
        assert!(record.stats().is_empty());
    }

    #[test]
    fn test_stat_columns_detect_normalization_collision() {
        let stats: StatValues = [("mean_Close", 1.0), ("MEAN_close", 2.0)]
            .into_iter()
            .collect();
        let record = SummaryRecord::new("a.csv", stats).unwrap();
        assert!(matches!(
            record.stat_columns(),
            Err(IngestError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn test_stat_columns_reject_fixed_column_key() {
        let stats: StatValues = [("timestamp", 1.0)].into_iter().collect();
        let record = SummaryRecord::new("a.csv", stats).unwrap();
        assert!(matches!(
            record.stat_columns(),
            Err(IngestError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_row_insert_maps_non_finite_to_null() {
        let stats: StatValues = [
            ("mean_Close", 10.0),
            ("std_Close", f64::NAN),
            ("max_Close", f64::INFINITY),
        ]
        .into_iter()
        .collect();
        let record = SummaryRecord::new("a.csv", stats).unwrap();
        let row = RowInsert::build(&record, Utc::now()).unwrap();

        assert_eq!(row.values.len(), 3);
        assert_eq!(row.values[0].1, Some(10.0));
        assert_eq!(row.values[1].1, None);
        assert_eq!(row.values[2].1, None);
        let cols: Vec<&str> = row.stat_columns().map(|c| c.as_str()).collect();
        assert_eq!(cols, vec!["mean_close", "std_close", "max_close"]);
    }

    #[test]
    fn test_stored_row_value_lookup_uses_sanitized_key() {
        let mut values = BTreeMap::new();
        values.insert("mean_close".to_string(), Some(101.5));
        values.insert("volume_max".to_string(), None);
        let row = StoredRow {
            id: 1,
            filename: "a.csv".to_string(),
            timestamp: Utc::now(),
            values,
        };

        assert_eq!(row.value("mean_Close"), Some(Some(101.5)));
        assert_eq!(row.value("volume_max"), Some(None));
        assert_eq!(row.value("unknown"), None);
    }
}
