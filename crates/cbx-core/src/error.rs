//! Unified error types for the cbx ecosystem
//!
//! This module provides a common error type [`CbxError`] that can represent
//! errors from any part of the system. Structural problems with a raw file,
//! row-level parse failures, and invalid aggregation requests each get their
//! own variant so callers can react without string matching.
//!
//! # Example
//!
//! ```ignore
//! use cbx_core::{CbxError, CbxResult};
//!
//! fn run_etl(path: &str) -> CbxResult<()> {
//!     let result = load_raw(path)?;
//!     write_processed(&result.records, "processed.csv")?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all cbx operations.
///
/// Every variant carries enough context (path, row index, column name,
/// offending value) to diagnose a failure without re-reading the source
/// file.
#[derive(Error, Debug)]
pub enum CbxError {
    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raw file structure unrecognized (separator, encoding, missing columns)
    #[error("unrecognized file structure in '{path}': {detail} (sample: {sample:?})")]
    Format {
        path: String,
        detail: String,
        sample: String,
    },

    /// A specific row's content is invalid
    #[error("parse error at row {row}, column '{column}', value '{value}': {detail}")]
    Parse {
        row: usize,
        column: String,
        value: String,
        detail: String,
    },

    /// Invalid aggregation or schema configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Errors surfaced by the underlying table machinery
    #[error("data error: {0}")]
    Data(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using CbxError.
pub type CbxResult<T> = Result<T, CbxError>;

impl CbxError {
    /// Structural failure of a raw file.
    pub fn format(path: impl Into<String>, detail: impl Into<String>, sample: &str) -> Self {
        // Cap the sample so the message stays printable for binary-ish input.
        let sample: String = sample.chars().take(120).collect();
        CbxError::Format {
            path: path.into(),
            detail: detail.into(),
            sample,
        }
    }

    /// Row-level failure, 1-based row index counted from the file start.
    pub fn parse(
        row: usize,
        column: impl Into<String>,
        value: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        CbxError::Parse {
            row,
            column: column.into(),
            value: value.into(),
            detail: detail.into(),
        }
    }

    pub fn config(detail: impl Into<String>) -> Self {
        CbxError::Config(detail.into())
    }

    /// Wrap an error from csv/polars/serde machinery.
    pub fn data(err: impl std::fmt::Display) -> Self {
        CbxError::Data(err.to_string())
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for CbxError {
    fn from(err: anyhow::Error) -> Self {
        CbxError::Other(err.to_string())
    }
}

// Conversion from string-like types for convenience
impl From<String> for CbxError {
    fn from(s: String) -> Self {
        CbxError::Other(s)
    }
}

impl From<&str> for CbxError {
    fn from(s: &str) -> Self {
        CbxError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CbxError::config("unknown granularity 'fortnight'");
        assert!(err.to_string().contains("configuration error"));
        assert!(err.to_string().contains("fortnight"));
    }

    #[test]
    fn test_parse_error_carries_context() {
        let err = CbxError::parse(42, "Date", "2024-13-01", "month out of range");
        let msg = err.to_string();
        assert!(msg.contains("row 42"));
        assert!(msg.contains("Date"));
        assert!(msg.contains("2024-13-01"));
    }

    #[test]
    fn test_format_error_truncates_sample() {
        let long = "x".repeat(500);
        let err = CbxError::format("data.csv", "no separator candidate", &long);
        match err {
            CbxError::Format { sample, .. } => assert_eq!(sample.len(), 120),
            _ => panic!("expected Format variant"),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cbx_err: CbxError = io_err.into();
        assert!(matches!(cbx_err, CbxError::Io(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> CbxResult<()> {
            Err(CbxError::config("bad request"))
        }

        fn outer() -> CbxResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
