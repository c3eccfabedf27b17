//! Data model for immunisation batch record processing.

pub mod columns;
pub mod error;
pub mod operation;
pub mod outcome;
pub mod permission;
pub mod row;
pub mod vaccine;

pub use error::{ModelError, Result};
pub use operation::{ActionFlag, Operation};
pub use outcome::{
    Diagnostics, FailureReason, OutcomeRecord, OutcomeStatus, RejectionKind, RowOutcome,
};
pub use permission::{Grant, Permission, PermissionSet};
pub use row::CsvRow;
pub use vaccine::{Disease, VaccineType};
