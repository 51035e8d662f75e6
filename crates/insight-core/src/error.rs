use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the ledger pipeline.
#[derive(Error, Debug)]
pub enum InsightError {
    /// A ledger source could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory source held no CSV files.
    #[error("No CSV files found in {0}")]
    NoDataFiles(PathBuf),

    /// The CSV reader rejected the input.
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The tabular structure is malformed (missing header, ragged rows, ...).
    #[error("Malformed table at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// A cell value could not be coerced to the expected type.
    #[error("Cannot convert {value:?} to {expected}")]
    TypeCoercion { value: String, expected: &'static str },

    /// A requested column is not part of the table schema.
    #[error("Column not found: {0}")]
    MissingColumn(String),

    /// A canonical transaction type never occurs in the dataset.
    #[error("Transaction type {0:?} is absent from the dataset")]
    MissingTransactionType(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be produced or parsed.
    #[error("Failed to process JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl InsightError {
    /// `true` for the errors that must abort the whole run (unreadable or
    /// structurally broken source).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            InsightError::FileRead { .. }
                | InsightError::NoDataFiles(_)
                | InsightError::Csv(_)
                | InsightError::Parse { .. }
                | InsightError::Io(_)
        )
    }
}

/// Convenience alias used throughout the insight crates.
pub type Result<T> = std::result::Result<T, InsightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = InsightError::FileRead {
            path: PathBuf::from("/some/ledger.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/some/ledger.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_parse() {
        let err = InsightError::Parse {
            line: 4,
            message: "expected 5 fields, found 3".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed table at line 4: expected 5 fields, found 3"
        );
    }

    #[test]
    fn test_error_display_type_coercion() {
        let err = InsightError::TypeCoercion {
            value: "not-a-date".to_string(),
            expected: "date",
        };
        assert_eq!(err.to_string(), "Cannot convert \"not-a-date\" to date");
    }

    #[test]
    fn test_error_display_missing_column() {
        let err = InsightError::MissingColumn("year".to_string());
        assert_eq!(err.to_string(), "Column not found: year");
    }

    #[test]
    fn test_error_display_missing_transaction_type() {
        let err = InsightError::MissingTransactionType("Income".to_string());
        assert_eq!(
            err.to_string(),
            "Transaction type \"Income\" is absent from the dataset"
        );
    }

    #[test]
    fn test_error_display_no_data_files() {
        let err = InsightError::NoDataFiles(PathBuf::from("/empty/dir"));
        assert_eq!(err.to_string(), "No CSV files found in /empty/dir");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: InsightError = io_err.into();
        assert!(err.to_string().contains("denied"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: InsightError = json_err.into();
        assert!(err.to_string().contains("Failed to process JSON"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_key_and_type_errors_are_not_fatal() {
        assert!(!InsightError::MissingColumn("x".into()).is_fatal());
        assert!(!InsightError::TypeCoercion {
            value: "x".into(),
            expected: "number"
        }
        .is_fatal());
    }
}
