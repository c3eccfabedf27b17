//! Error types for batch file ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort ingestion of a batch file.
///
/// All of these are batch-level: a file that fails here produces no row
/// outcomes.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Batch file not found.
    #[error("batch file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Structure Errors ===
    /// File has no header line.
    #[error("batch file is empty")]
    EmptyFile,

    /// Header line has the wrong number of columns.
    #[error("file headers are invalid: expected {expected} columns, found {found}")]
    HeaderCount { expected: usize, found: usize },

    /// Header line names or orders a column differently.
    #[error("file headers are invalid: column {column} should be '{expected}', found '{found}'")]
    HeaderMismatch {
        /// 1-based column position.
        column: usize,
        expected: &'static str,
        found: String,
    },

    /// A data line has a different number of fields than the header.
    #[error("line {line} has {found} fields, expected {expected}")]
    ColumnCount {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// The CSV reader failed (bad quoting, invalid UTF-8, I/O).
    #[error("failed to parse batch file: {source}")]
    Csv {
        #[source]
        source: csv::Error,
    },

    // === File Key Errors ===
    /// File key does not follow the naming convention.
    #[error("invalid file key '{key}': {reason}")]
    InvalidFileKey { key: String, reason: &'static str },
}

impl From<csv::Error> for IngestError {
    fn from(source: csv::Error) -> Self {
        Self::Csv { source }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
