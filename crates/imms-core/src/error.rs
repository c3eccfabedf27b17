//! Error types for the batch pipeline and its collaborators.

use std::path::PathBuf;
use std::time::Duration;

use imms_ingest::IngestError;
use thiserror::Error;

/// Failure of the external permission lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Supplier has no permission entry.
    #[error("no permissions configured for supplier '{supplier}'")]
    NotFound { supplier: String },

    /// Lookup did not answer within the batch's timeout.
    #[error("permission lookup for supplier '{supplier}' timed out after {timeout:?}")]
    Timeout { supplier: String, timeout: Duration },

    /// Backend failed for any other reason.
    #[error("permission lookup failed: {message}")]
    Backend { message: String },
}

/// Failure to hand an outcome record to a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write outcome: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize outcome: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write acknowledgment file: {source}")]
    Csv {
        #[source]
        source: csv::Error,
    },

    /// Sink refused the record.
    #[error("outcome sink rejected record: {message}")]
    Rejected { message: String },
}

impl From<std::io::Error> for SinkError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source }
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialize { source }
    }
}

impl From<csv::Error> for SinkError {
    fn from(source: csv::Error) -> Self {
        Self::Csv { source }
    }
}

/// Failure to build the FHIR resource for a valid row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("{column} cannot be converted to FHIR")]
    InvalidValue { column: &'static str },
}

/// Failure to load configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse permissions file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Batch-level failures. Any of these ends the batch; row-level problems
/// never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed file structure, detected before any row is processed.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Permissions could not be resolved; no row is processed.
    #[error("permission lookup failed for supplier '{supplier}': {source}")]
    PermissionLookup {
        supplier: String,
        #[source]
        source: LookupError,
    },

    /// Outcome could not be published; processing stops at this row.
    #[error("outcome sink failed at row {row_index}: {source}")]
    Sink {
        row_index: usize,
        #[source]
        source: SinkError,
    },

    /// Sink could not flush after the last row.
    #[error("failed to finish outcome sink: {source}")]
    SinkFinish {
        #[source]
        source: SinkError,
    },
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
