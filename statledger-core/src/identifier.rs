//! Identifier sanitization.
//!
//! Statistic keys come from column headers of user-uploaded data, so they are
//! untrusted. SQL identifiers cannot be bound as parameters, which makes this
//! module the only defense between a key and the DDL/DML text: every
//! identifier that reaches a statement is produced by [`ColumnIdentifier::quoted`]
//! or [`TableName::quoted`].
//!
//! Canonical form: surrounding whitespace trimmed, folded to lower case. The
//! quoted form wraps the canonical name in `"` and doubles any embedded `"`.

use crate::error::{IngestError, IngestResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// PostgreSQL identifier quote character.
pub const IDENTIFIER_QUOTE: char = '"';

/// Longest identifier PostgreSQL stores without truncation (NAMEDATALEN - 1).
pub const MAX_IDENTIFIER_BYTES: usize = 63;

/// Surrogate identity column.
pub const ID_COLUMN: &str = "id";

/// Source filename column.
pub const FILENAME_COLUMN: &str = "filename";

/// Write-time timestamp column.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Wrap `name` in identifier quotes, doubling embedded quote characters.
pub fn quote_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push(IDENTIFIER_QUOTE);
    for ch in name.chars() {
        if ch == IDENTIFIER_QUOTE {
            out.push(IDENTIFIER_QUOTE);
        }
        out.push(ch);
    }
    out.push(IDENTIFIER_QUOTE);
    out
}

fn normalize(raw: &str) -> Result<String, &'static str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("identifier is empty");
    }
    if trimmed.chars().any(|c| c == '\0') {
        return Err("identifier contains a NUL byte");
    }
    if trimmed.chars().any(char::is_control) {
        return Err("identifier contains control characters");
    }

    let canonical = trimmed.to_lowercase();
    if canonical.len() > MAX_IDENTIFIER_BYTES {
        return Err("identifier exceeds 63 bytes and would be truncated by the store");
    }
    Ok(canonical)
}

/// Validate a statistic key and turn it into a column identifier.
///
/// Fails with `InvalidIdentifier` for keys that cannot be stored faithfully,
/// and for keys that would shadow one of the fixed identity/audit columns.
pub fn sanitize(raw_key: &str) -> IngestResult<ColumnIdentifier> {
    let canonical =
        normalize(raw_key).map_err(|reason| IngestError::invalid_identifier(raw_key, reason))?;

    if [ID_COLUMN, FILENAME_COLUMN, TIMESTAMP_COLUMN].contains(&canonical.as_str()) {
        return Err(IngestError::invalid_identifier(
            raw_key,
            "identifier collides with a fixed column",
        ));
    }

    Ok(ColumnIdentifier(canonical))
}

/// The fixed identity/audit columns, in table order.
pub fn fixed_columns() -> [ColumnIdentifier; 3] {
    [
        ColumnIdentifier(ID_COLUMN.to_string()),
        ColumnIdentifier(FILENAME_COLUMN.to_string()),
        ColumnIdentifier(TIMESTAMP_COLUMN.to_string()),
    ]
}

// ============================================================================
// COLUMN IDENTIFIER
// ============================================================================

/// A validated, canonical column name.
///
/// Built by [`sanitize`] for statistic keys and by [`fixed_columns`]; the
/// `TryFrom<String>` path (used when reading names back) skips the fixed-name check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnIdentifier(String);

impl ColumnIdentifier {
    /// Canonical (unquoted) name, as reported by the store's metadata.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Quoted form, safe to embed in SQL text.
    pub fn quoted(&self) -> String {
        quote_identifier(&self.0)
    }

    /// Whether this is one of `id`, `filename`, `timestamp`.
    pub fn is_fixed(&self) -> bool {
        [ID_COLUMN, FILENAME_COLUMN, TIMESTAMP_COLUMN].contains(&self.0.as_str())
    }
}

impl fmt::Display for ColumnIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ColumnIdentifier {
    type Error = IngestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match normalize(&value) {
            Ok(canonical) => Ok(ColumnIdentifier(canonical)),
            Err(reason) => Err(IngestError::invalid_identifier(value, reason)),
        }
    }
}

impl From<ColumnIdentifier> for String {
    fn from(value: ColumnIdentifier) -> Self {
        value.0
    }
}

impl AsRef<str> for ColumnIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// TABLE NAME
// ============================================================================

/// A validated, canonical table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(pub(crate) String);

impl TableName {
    pub fn new(raw: &str) -> IngestResult<Self> {
        normalize(raw)
            .map(TableName)
            .map_err(|reason| IngestError::invalid_identifier(raw, reason))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn quoted(&self) -> String {
        quote_identifier(&self.0)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TableName {
    type Error = IngestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TableName::new(&value)
    }
}

impl From<TableName> for String {
    fn from(value: TableName) -> Self {
        value.0
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_folds_case_and_trims() {
        let col = sanitize("  mean_Close ").unwrap();
        assert_eq!(col.as_str(), "mean_close");
        assert_eq!(col.quoted(), "\"mean_close\"");
    }

    #[test]
    fn test_sanitize_rejects_empty() {
        assert!(matches!(
            sanitize(""),
            Err(IngestError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            sanitize("   "),
            Err(IngestError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_sanitize_rejects_control_characters() {
        assert!(sanitize("mean\nClose").is_err());
        assert!(sanitize("mean\0Close").is_err());
        assert!(sanitize("mean\u{7f}").is_err());
    }

    #[test]
    fn test_sanitize_rejects_overlong_keys() {
        let key = "x".repeat(MAX_IDENTIFIER_BYTES);
        assert!(sanitize(&key).is_ok());

        let key = "x".repeat(MAX_IDENTIFIER_BYTES + 1);
        let err = sanitize(&key).unwrap_err();
        assert!(format!("{}", err).contains("63 bytes"));
    }

    #[test]
    fn test_sanitize_rejects_fixed_columns() {
        for key in ["id", "Filename", "TIMESTAMP"] {
            assert!(sanitize(key).is_err(), "{} should be rejected", key);
        }
    }

    #[test]
    fn test_embedded_quote_is_doubled() {
        let col = sanitize("a\"b").unwrap();
        assert_eq!(col.as_str(), "a\"b");
        assert_eq!(col.quoted(), "\"a\"\"b\"");
    }

    #[test]
    fn test_adversarial_key_stays_one_identifier() {
        let col = sanitize("Close; DROP TABLE x").unwrap();
        assert_eq!(col.quoted(), "\"close; drop table x\"");

        let col = sanitize("x\"; DROP TABLE summary_statistics; --").unwrap();
        assert_eq!(
            col.quoted(),
            "\"x\"\"; drop table summary_statistics; --\""
        );
    }

    #[test]
    fn test_fixed_columns_are_fixed() {
        let fixed = fixed_columns();
        assert_eq!(fixed[0].as_str(), "id");
        assert_eq!(fixed[1].as_str(), "filename");
        assert_eq!(fixed[2].as_str(), "timestamp");
        assert!(fixed.iter().all(ColumnIdentifier::is_fixed));
        assert!(!sanitize("mean_close").unwrap().is_fixed());
    }

    #[test]
    fn test_table_name() {
        let table = TableName::new("Summary_Statistics").unwrap();
        assert_eq!(table.as_str(), "summary_statistics");
        assert_eq!(table.quoted(), "\"summary_statistics\"");
        assert!(TableName::new("").is_err());
    }

    #[test]
    fn test_column_identifier_serde() {
        let col: ColumnIdentifier = serde_json::from_str("\"Mean_Close\"").unwrap();
        assert_eq!(col.as_str(), "mean_close");
        assert_eq!(serde_json::to_string(&col).unwrap(), "\"mean_close\"");
        assert!(serde_json::from_str::<ColumnIdentifier>("\"\"").is_err());
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    /// Count identifier-quote characters that are not part of a doubled pair
    /// inside the quoted body.
    fn unbalanced_quotes(quoted: &str) -> usize {
        let body = &quoted[1..quoted.len() - 1];
        let mut count = 0;
        let mut chars = body.chars().peekable();
        while let Some(c) = chars.next() {
            if c == IDENTIFIER_QUOTE {
                if chars.peek() == Some(&IDENTIFIER_QUOTE) {
                    chars.next();
                } else {
                    count += 1;
                }
            }
        }
        count
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// A sanitized identifier can never terminate its own quoting, so the
        /// quoted form is always a single identifier token.
        #[test]
        fn prop_quoted_identifier_cannot_escape(raw in "\\PC{1,40}") {
            if let Ok(col) = sanitize(&raw) {
                let quoted = col.quoted();
                prop_assert!(quoted.starts_with(IDENTIFIER_QUOTE));
                prop_assert!(quoted.ends_with(IDENTIFIER_QUOTE));
                prop_assert_eq!(unbalanced_quotes(&quoted), 0);
            }
        }

        /// Sanitizing is idempotent on canonical names.
        #[test]
        fn prop_sanitize_idempotent(raw in "[A-Za-z][A-Za-z0-9_%; -]{0,30}") {
            if let Ok(col) = sanitize(&raw) {
                let again = sanitize(col.as_str()).unwrap();
                prop_assert_eq!(again, col);
            }
        }
    }
}
