//! Ledger configuration.

use crate::error::IngestResult;
use crate::identifier::TableName;

/// Default target table.
pub const DEFAULT_TABLE: &str = "summary_statistics";

/// Configuration of the persistence layer itself (store connection settings
/// live with the store implementation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Table every ingestion event is written to.
    pub table: TableName,
}

impl LedgerConfig {
    pub fn new(table: &str) -> IngestResult<Self> {
        Ok(Self {
            table: TableName::new(table)?,
        })
    }

    /// Create LedgerConfig from environment variables.
    ///
    /// Environment variables:
    /// - `STATLEDGER_TABLE`: target table name (default: summary_statistics)
    ///
    /// An invalid table name is an error rather than a silent fallback.
    pub fn from_env() -> IngestResult<Self> {
        let table =
            std::env::var("STATLEDGER_TABLE").unwrap_or_else(|_| DEFAULT_TABLE.to_string());
        Self::new(&table)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            table: TableName(DEFAULT_TABLE.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnvVarGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let original = std::env::var(key).ok();
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
            Self { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.original.as_deref() {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.table.as_str(), DEFAULT_TABLE);
    }

    #[test]
    fn test_from_env() {
        {
            let _guard = EnvVarGuard::set("STATLEDGER_TABLE", Some("Uploads_Stats"));
            let config = LedgerConfig::from_env().unwrap();
            assert_eq!(config.table.as_str(), "uploads_stats");
        }
        {
            let _guard = EnvVarGuard::set("STATLEDGER_TABLE", Some("bad\ttable"));
            assert!(LedgerConfig::from_env().is_err());
        }
        {
            let _guard = EnvVarGuard::set("STATLEDGER_TABLE", None);
            assert_eq!(LedgerConfig::from_env().unwrap(), LedgerConfig::default());
        }
    }
}
