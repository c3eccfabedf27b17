//! Field-level validation of a batch row.
//!
//! Every check runs on every row and all failures are collected; the
//! acknowledgment file reports the complete list. Messages never echo
//! patient-identifying values.

use imms_model::columns::{
    self, DATE_AND_TIME, DOSE_AMOUNT, DOSE_SEQUENCE, EXPIRY_DATE, NHS_NUMBER, PERSON_DOB,
    PERSON_GENDER_CODE, PRIMARY_SOURCE, RECORDED_DATE, UNIQUE_ID, UNIQUE_ID_URI,
    VACCINATION_PROCEDURE_CODE,
};
use imms_model::{CsvRow, FailureReason, VaccineType};
use tracing::trace;

use crate::dates::{is_valid_date, is_valid_date_time};
use crate::nhs::is_valid_nhs_number;
use crate::procedure::ProcedureCodeTable;
use crate::snomed::is_valid_simple_snomed;

/// Recognised `PERSON_GENDER_CODE` values, numeric or textual.
const GENDER_CODES: &[&str] = &["0", "1", "2", "9", "unknown", "male", "female", "other"];

/// Result of checking one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordCheck {
    /// Vaccine type resolved from the procedure code, if it resolved.
    pub vaccine_type: Option<VaccineType>,
    pub failures: Vec<FailureReason>,
}

impl RecordCheck {
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    /// True when the only failures are the unique id columns.
    pub fn only_unique_id_failures(&self) -> bool {
        !self.failures.is_empty()
            && self.failures.iter().all(|reason| {
                reason.field_location == columns::field_location(UNIQUE_ID)
                    || reason.field_location == columns::field_location(UNIQUE_ID_URI)
            })
    }
}

/// Validates rows against the procedure code table and field rules.
#[derive(Debug, Clone, Default)]
pub struct RecordValidator {
    procedure_codes: ProcedureCodeTable,
    expected_vaccine: Option<VaccineType>,
}

impl RecordValidator {
    pub fn new(procedure_codes: ProcedureCodeTable) -> Self {
        Self {
            procedure_codes,
            expected_vaccine: None,
        }
    }

    /// Reject rows whose procedure code maps to a different vaccine type.
    #[must_use]
    pub fn with_expected_vaccine(mut self, vaccine: Option<VaccineType>) -> Self {
        self.expected_vaccine = vaccine;
        self
    }

    pub fn procedure_codes(&self) -> &ProcedureCodeTable {
        &self.procedure_codes
    }

    pub fn expected_vaccine(&self) -> Option<VaccineType> {
        self.expected_vaccine
    }

    /// Failure reasons for `row`; empty means the row is valid.
    pub fn validate(&self, row: &CsvRow) -> Vec<FailureReason> {
        self.check(row).failures
    }

    /// Run every check and resolve the row's vaccine type.
    pub fn check(&self, row: &CsvRow) -> RecordCheck {
        let mut failures = Vec::new();

        check_required(row, UNIQUE_ID, &mut failures);
        check_required(row, UNIQUE_ID_URI, &mut failures);

        if let Some(nhs_number) = row.present(NHS_NUMBER)
            && !is_valid_nhs_number(nhs_number)
        {
            failures.push(reason(
                NHS_NUMBER,
                "NHS_NUMBER must be 10 digits with a valid check digit",
            ));
        }

        let vaccine_type = self.check_procedure_code(row, &mut failures);

        for column in columns::SNOMED_CODED {
            let Some(code) = row.present(column) else {
                continue;
            };
            if !is_valid_simple_snomed(code) {
                failures.push(reason(
                    column,
                    format!("{column} '{code}' is not a valid SNOMED CT code"),
                ));
            }
        }

        if let Some(value) = row.non_empty(DATE_AND_TIME)
            && !is_valid_date_time(value)
        {
            failures.push(reason(
                DATE_AND_TIME,
                "DATE_AND_TIME must be formatted YYYYMMDDThhmmss with optional 00 or 01 timezone",
            ));
        }
        for column in [PERSON_DOB, RECORDED_DATE, EXPIRY_DATE] {
            if let Some(value) = row.non_empty(column)
                && !is_valid_date(value)
            {
                failures.push(reason(column, format!("{column} must be a valid YYYYMMDD date")));
            }
        }

        check_optional_fields(row, &mut failures);

        trace!(
            row = row.row_number(),
            failures = failures.len(),
            "record checked"
        );
        RecordCheck {
            vaccine_type,
            failures,
        }
    }

    fn check_procedure_code(
        &self,
        row: &CsvRow,
        failures: &mut Vec<FailureReason>,
    ) -> Option<VaccineType> {
        let Some(code) = row.present(VACCINATION_PROCEDURE_CODE) else {
            failures.push(reason(
                VACCINATION_PROCEDURE_CODE,
                "VACCINATION_PROCEDURE_CODE is required",
            ));
            return None;
        };
        let Some(vaccine) = self.procedure_codes.vaccine_type_for(code) else {
            failures.push(reason(
                VACCINATION_PROCEDURE_CODE,
                format!("VACCINATION_PROCEDURE_CODE '{code}' is not a recognised vaccination procedure"),
            ));
            return None;
        };
        if let Some(expected) = self.expected_vaccine
            && expected != vaccine
        {
            failures.push(reason(
                VACCINATION_PROCEDURE_CODE,
                format!(
                    "VACCINATION_PROCEDURE_CODE '{code}' is a {vaccine} procedure but the file is for {expected}"
                ),
            ));
        }
        Some(vaccine)
    }
}

fn check_required(row: &CsvRow, column: &str, failures: &mut Vec<FailureReason>) {
    if row.non_empty(column).is_none() {
        failures.push(reason(column, format!("{column} is required")));
    }
}

fn check_optional_fields(row: &CsvRow, failures: &mut Vec<FailureReason>) {
    if let Some(value) = row.non_empty(PRIMARY_SOURCE)
        && !(value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false"))
    {
        failures.push(reason(PRIMARY_SOURCE, "PRIMARY_SOURCE must be TRUE or FALSE"));
    }

    if let Some(value) = row.non_empty(PERSON_GENDER_CODE)
        && !GENDER_CODES
            .iter()
            .any(|code| code.eq_ignore_ascii_case(value))
    {
        failures.push(reason(
            PERSON_GENDER_CODE,
            "PERSON_GENDER_CODE must be one of 0, 1, 2, 9, unknown, male, female, other",
        ));
    }

    if let Some(value) = row.non_empty(DOSE_SEQUENCE)
        && !matches!(value.parse::<u32>(), Ok(n) if n > 0)
    {
        failures.push(reason(DOSE_SEQUENCE, "DOSE_SEQUENCE must be a positive integer"));
    }

    if let Some(value) = row.non_empty(DOSE_AMOUNT)
        && !matches!(value.parse::<f64>(), Ok(n) if n.is_finite() && n >= 0.0)
    {
        failures.push(reason(DOSE_AMOUNT, "DOSE_AMOUNT must be a non-negative number"));
    }
}

fn reason(column: &str, message: impl Into<String>) -> FailureReason {
    FailureReason::new(columns::field_location(column), message)
}
