//! Per-row processing outcomes and their wire form.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::operation::Operation;

/// A single reason a row was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    /// CSV column (lower-cased) or FHIR path implicated.
    pub field_location: String,
    pub message: String,
}

impl FailureReason {
    pub fn new(field_location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field_location: field_location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field_location, self.message)
    }
}

/// Why a row was rejected, used for diagnostics codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionKind {
    /// One or more field-level validation failures.
    ValidationFailed,
    /// `UNIQUE_ID` or `UNIQUE_ID_URI` missing (and nothing else wrong).
    MissingUniqueId,
    InvalidActionFlag,
    /// Row was valid but the supplier lacks the permission.
    NoPermissions,
    /// Unexpected failure while processing the row.
    InvalidConversion,
}

impl RejectionKind {
    pub const fn error_type(&self) -> &'static str {
        match self {
            RejectionKind::ValidationFailed => "VALIDATION_FAILED",
            RejectionKind::MissingUniqueId => "MISSING_UNIQUE_ID",
            RejectionKind::InvalidActionFlag => "INVALID_ACTION_FLAG",
            RejectionKind::NoPermissions => "NO_PERMISSIONS",
            RejectionKind::InvalidConversion => "INVALID_CONVERSION",
        }
    }

    pub const fn status_code(&self) -> u16 {
        match self {
            RejectionKind::NoPermissions => 403,
            RejectionKind::InvalidConversion => 500,
            _ => 400,
        }
    }

    /// Reason used when a rejection is raised without a more specific one.
    pub fn default_reason(&self) -> FailureReason {
        match self {
            RejectionKind::ValidationFailed => FailureReason::new("row", "row failed validation"),
            RejectionKind::MissingUniqueId => {
                FailureReason::new("unique_id", "UNIQUE_ID or UNIQUE_ID_URI is missing")
            }
            RejectionKind::InvalidActionFlag => {
                FailureReason::new("action_flag", "invalid or missing action flag")
            }
            RejectionKind::NoPermissions => {
                FailureReason::new("action_flag", "No permissions for requested operation")
            }
            RejectionKind::InvalidConversion => FailureReason::new(
                "row",
                "Unable to convert row to FHIR Immunization Resource JSON format",
            ),
        }
    }
}

/// Result of processing one row. Every row yields exactly one outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Accepted {
        resource: Value,
        operation: Operation,
    },
    Rejected {
        kind: RejectionKind,
        reasons: Vec<FailureReason>,
    },
}

impl RowOutcome {
    /// Build a rejection. An empty reason list is replaced by the kind's
    /// default reason so a rejection never carries zero reasons.
    pub fn rejected(kind: RejectionKind, mut reasons: Vec<FailureReason>) -> Self {
        if reasons.is_empty() {
            reasons.push(kind.default_reason());
        }
        RowOutcome::Rejected { kind, reasons }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, RowOutcome::Accepted { .. })
    }

    pub fn status(&self) -> OutcomeStatus {
        match self {
            RowOutcome::Accepted { .. } => OutcomeStatus::Accepted,
            RowOutcome::Rejected { .. } => OutcomeStatus::Rejected,
        }
    }

    pub fn reasons(&self) -> &[FailureReason] {
        match self {
            RowOutcome::Accepted { .. } => &[],
            RowOutcome::Rejected { reasons, .. } => reasons,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Accepted,
    Rejected,
}

/// Diagnostics block attached to rejected outcome records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub error_type: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub error_message: String,
}

impl Diagnostics {
    pub fn new(kind: RejectionKind, reasons: &[FailureReason]) -> Self {
        let error_message = reasons
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            error_type: kind.error_type().to_string(),
            status_code: kind.status_code(),
            error_message,
        }
    }
}

/// Message published to the outcome sink for one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// `<message_id>#<row number>`.
    pub row_id: String,
    /// 0-based position of the row in the file.
    pub row_index: usize,
    pub file_key: String,
    pub supplier: String,
    pub created_at_formatted_string: String,
    /// Operation derived from `ACTION_FLAG`, or the raw flag when invalid.
    pub operation_requested: String,
    /// `<UNIQUE_ID>^<UNIQUE_ID_URI>`.
    pub local_id: String,
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fhir_json: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<FailureReason>,
}

impl OutcomeRecord {
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_always_has_a_reason() {
        let outcome = RowOutcome::rejected(RejectionKind::InvalidActionFlag, vec![]);
        assert_eq!(outcome.reasons().len(), 1);
        assert_eq!(outcome.reasons()[0].message, "invalid or missing action flag");
    }

    #[test]
    fn diagnostics_join_reasons() {
        let reasons = vec![
            FailureReason::new("nhs_number", "bad"),
            FailureReason::new("unique_id", "missing"),
        ];
        let diagnostics = Diagnostics::new(RejectionKind::ValidationFailed, &reasons);
        assert_eq!(diagnostics.status_code, 400);
        assert_eq!(diagnostics.error_message, "nhs_number: bad; unique_id: missing");
    }

    #[test]
    fn no_permissions_is_forbidden() {
        assert_eq!(RejectionKind::NoPermissions.status_code(), 403);
        assert_eq!(RejectionKind::InvalidConversion.status_code(), 500);
    }
}
