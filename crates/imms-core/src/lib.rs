//! Immunisation batch pipeline.
//!
//! Resolves supplier permissions once per batch, then validates, classifies
//! and converts every row of a batch file, handing one outcome record per
//! row to an [`OutcomeSink`] in input order.

pub mod ack;
pub mod classify;
pub mod config;
pub mod error;
pub mod fhir;
pub mod lookup;
pub mod permissions;
pub mod pipeline;
pub mod ports;
pub mod sinks;

pub use ack::{ACK_HEADERS, AckFileSink, AckRow, ack_file_name};
pub use classify::{Classification, InvalidActionFlag, classify};
pub use config::{CONFIG_ENV_VAR, DEFAULT_LOOKUP_TIMEOUT_MS, PipelineConfig};
pub use error::{ConfigError, ConversionError, LookupError, PipelineError, Result, SinkError};
pub use fhir::convert_to_immunization;
pub use lookup::StaticPermissionLookup;
pub use permissions::{
    get_operation_permissions, operations_for, parse_permissions, resolve_permission_set,
};
pub use pipeline::{
    BatchContext, BatchPipeline, BatchSummary, MESSAGE_ID_LENGTH, message_id_for, outcome_record,
};
pub use ports::{OutcomeSink, PermissionLookup};
pub use sinks::{JsonLinesSink, MemorySink, MultiSink};
