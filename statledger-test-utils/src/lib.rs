//! statledger Test Utilities
//!
//! Shared test infrastructure for all statledger crates:
//! - Proptest generators for statistic keys, stat maps and summary records
//! - Test fixtures for common scenarios
//! - Custom assertions for ingestion results

// Re-export the mock store and core types for convenience
pub use statledger_core::*;
pub use statledger_storage::{Ingestor, MockStore, SchemaStore};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating statledger inputs.

    use super::*;
    use proptest::prelude::*;

    /// Generate a statistic key that sanitizes cleanly and is already canonical.
    pub fn arb_stat_key() -> impl Strategy<Value = String> {
        "[a-z_][a-z0-9_]{0,30}".prop_filter("fixed column name", |k| {
            ![ID_COLUMN, FILENAME_COLUMN, TIMESTAMP_COLUMN].contains(&k.as_str())
        })
    }

    /// Generate a key in the `<statistic>_<series>` shape of a described table.
    pub fn arb_flattened_key() -> impl Strategy<Value = String> {
        (
            prop::sample::select(vec!["count", "mean", "std", "min", "25%", "50%", "75%", "max"]),
            "[A-Za-z][A-Za-z0-9 ]{0,12}[A-Za-z0-9]",
        )
            .prop_map(|(statistic, series)| flatten_stat_key(statistic, &series))
    }

    /// Generate a key that is valid but hostile to naive SQL interpolation.
    pub fn arb_adversarial_key() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("x\"; DROP TABLE summary_stats; --".to_string()),
            Just("robert'); delete from summary_stats; --".to_string()),
            Just("a\"\"b".to_string()),
            Just("select".to_string()),
            Just("mean close (adj.)".to_string()),
            Just("médiane_close".to_string()),
            Just("25%_volume".to_string()),
            "[a-z]{1,8}[\"';%()\\- ][a-z]{1,8}",
        ]
    }

    /// Generate a finite statistic value.
    pub fn arb_stat_value() -> impl Strategy<Value = f64> {
        prop_oneof![
            -1.0e12..1.0e12_f64,
            Just(0.0),
            Just(f64::MIN_POSITIVE),
        ]
    }

    /// Generate a stat map with distinct, valid, canonical keys.
    pub fn arb_stat_values(max_len: usize) -> impl Strategy<Value = StatValues> {
        prop::collection::btree_map(arb_stat_key(), arb_stat_value(), 0..=max_len)
            .prop_map(|entries| entries.into_iter().collect())
    }

    /// Generate a non-empty filename.
    pub fn arb_filename() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_\\-]{1,24}\\.(csv|CSV|tsv)"
    }

    /// Generate a summary record that ingests without a validation error.
    pub fn arb_summary_record() -> impl Strategy<Value = SummaryRecord> {
        (arb_filename(), arb_stat_values(12)).prop_filter_map(
            "record rejected",
            |(filename, stats)| SummaryRecord::new(filename, stats).ok(),
        )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    /// Stats of the reference file: one series, two statistics.
    pub fn sample_stats() -> StatValues {
        [("mean_Close", 101.5), ("std_Close", 3.2)].into_iter().collect()
    }

    /// The reference ingestion event for `a.csv`.
    pub fn sample_record() -> SummaryRecord {
        match SummaryRecord::new("a.csv", sample_stats()) {
            Ok(record) => record,
            Err(e) => panic!("sample record must be valid: {}", e),
        }
    }

    /// Request body for the reference event, as a client would post it.
    pub fn sample_request_body() -> serde_json::Value {
        serde_json::json!({
            "filename": "a.csv",
            "stats": { "mean_Close": 101.5, "std_Close": 3.2 }
        })
    }

    /// A follow-up event that introduces one new statistic.
    pub fn follow_up_record() -> SummaryRecord {
        let stats = [("mean_Close", 99.0), ("max_Volume", 5.0e6)]
            .into_iter()
            .collect();
        match SummaryRecord::new("b.csv", stats) {
            Ok(record) => record,
            Err(e) => panic!("follow-up record must be valid: {}", e),
        }
    }

    /// A deterministic ingestion timestamp.
    pub fn fixed_timestamp() -> Timestamp {
        match Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single() {
            Some(ts) => ts,
            None => panic!("fixed timestamp must be unambiguous"),
        }
    }

    /// The default table name.
    pub fn test_table() -> TableName {
        LedgerConfig::default().table
    }

    /// A fresh mock store and an ingestor bound to it.
    pub fn mock_ingestor() -> (Arc<MockStore>, Ingestor) {
        let store = Arc::new(MockStore::new());
        let ingestor = Ingestor::new(store.clone(), &LedgerConfig::default());
        (store, ingestor)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for ingestion results and stored schemas.

    use super::*;

    /// Assert that an IngestResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &IngestResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that an IngestResult failed in the given step.
    #[track_caller]
    pub fn assert_failed_in<T: std::fmt::Debug>(result: &IngestResult<T>, step: IngestionStep) {
        match result {
            Err(e) => assert_eq!(e.phase(), step, "Wrong failure step for {:?}", e),
            Ok(v) => panic!("Expected failure in {:?}, got Ok: {:?}", step, v),
        }
    }

    /// Assert that an IngestResult is an InvalidIdentifier error.
    #[track_caller]
    pub fn assert_invalid_identifier<T: std::fmt::Debug>(result: &IngestResult<T>) {
        match result {
            Err(IngestError::InvalidIdentifier { .. }) => {}
            other => panic!("Expected InvalidIdentifier, got: {:?}", other),
        }
    }

    /// Assert that a column list starts with the fixed columns in table order.
    #[track_caller]
    pub fn assert_fixed_prefix(columns: &[String]) {
        let fixed: Vec<String> = fixed_columns().into_iter().map(String::from).collect();
        assert!(
            columns.len() >= fixed.len() && columns[..fixed.len()] == fixed[..],
            "Expected fixed columns {:?} first, got {:?}",
            fixed,
            columns
        );
    }

    /// Assert that every stat key of `record` is a column in `columns`.
    #[track_caller]
    pub fn assert_columns_cover(columns: &[String], record: &SummaryRecord) {
        for key in record.stats().keys() {
            let column = match sanitize(key) {
                Ok(column) => column,
                Err(e) => panic!("Key {:?} does not sanitize: {}", key, e),
            };
            assert!(
                columns.iter().any(|c| c == column.as_str()),
                "Column {} missing from {:?}",
                column,
                columns
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sample_record_columns() {
        let record = fixtures::sample_record();
        let columns = record.stat_columns();
        assertions::assert_ok(&columns);
        let names: Vec<String> = columns
            .unwrap_or_default()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(names, vec!["mean_close", "std_close"]);
    }

    #[test]
    fn test_sample_row_insert_keeps_order() {
        let row = match RowInsert::build(&fixtures::sample_record(), fixtures::fixed_timestamp()) {
            Ok(row) => row,
            Err(e) => panic!("sample record must build a row: {}", e),
        };
        assert_eq!(row.filename, "a.csv");
        assert_eq!(row.timestamp, fixtures::fixed_timestamp());
        let columns: Vec<&str> = row.stat_columns().map(|c| c.as_str()).collect();
        assert_eq!(columns, vec!["mean_close", "std_close"]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_generated_keys_sanitize(key in generators::arb_stat_key()) {
            let column = sanitize(&key);
            prop_assert!(column.is_ok());
        }

        #[test]
        fn prop_adversarial_keys_sanitize(key in generators::arb_adversarial_key()) {
            prop_assert!(sanitize(&key).is_ok());
        }

        #[test]
        fn prop_flattened_keys_sanitize(key in generators::arb_flattened_key()) {
            prop_assert!(sanitize(&key).is_ok());
        }

        #[test]
        fn prop_generated_records_validate(record in generators::arb_summary_record()) {
            prop_assert!(record.stat_columns().is_ok());
        }
    }
}
