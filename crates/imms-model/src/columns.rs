//! Batch file column names.
//!
//! The header line of a batch file must match [`EXPECTED_HEADERS`] exactly,
//! in this order. This is a contract with upstream suppliers.

pub const NHS_NUMBER: &str = "NHS_NUMBER";
pub const PERSON_FORENAME: &str = "PERSON_FORENAME";
pub const PERSON_SURNAME: &str = "PERSON_SURNAME";
pub const PERSON_DOB: &str = "PERSON_DOB";
pub const PERSON_GENDER_CODE: &str = "PERSON_GENDER_CODE";
pub const PERSON_POSTCODE: &str = "PERSON_POSTCODE";
pub const DATE_AND_TIME: &str = "DATE_AND_TIME";
pub const SITE_CODE: &str = "SITE_CODE";
pub const SITE_CODE_TYPE_URI: &str = "SITE_CODE_TYPE_URI";
pub const UNIQUE_ID: &str = "UNIQUE_ID";
pub const UNIQUE_ID_URI: &str = "UNIQUE_ID_URI";
pub const ACTION_FLAG: &str = "ACTION_FLAG";
pub const PERFORMING_PROFESSIONAL_FORENAME: &str = "PERFORMING_PROFESSIONAL_FORENAME";
pub const PERFORMING_PROFESSIONAL_SURNAME: &str = "PERFORMING_PROFESSIONAL_SURNAME";
pub const RECORDED_DATE: &str = "RECORDED_DATE";
pub const PRIMARY_SOURCE: &str = "PRIMARY_SOURCE";
pub const VACCINATION_PROCEDURE_CODE: &str = "VACCINATION_PROCEDURE_CODE";
pub const VACCINATION_PROCEDURE_TERM: &str = "VACCINATION_PROCEDURE_TERM";
pub const DOSE_SEQUENCE: &str = "DOSE_SEQUENCE";
pub const VACCINE_PRODUCT_CODE: &str = "VACCINE_PRODUCT_CODE";
pub const VACCINE_PRODUCT_TERM: &str = "VACCINE_PRODUCT_TERM";
pub const VACCINE_MANUFACTURER: &str = "VACCINE_MANUFACTURER";
pub const BATCH_NUMBER: &str = "BATCH_NUMBER";
pub const EXPIRY_DATE: &str = "EXPIRY_DATE";
pub const SITE_OF_VACCINATION_CODE: &str = "SITE_OF_VACCINATION_CODE";
pub const SITE_OF_VACCINATION_TERM: &str = "SITE_OF_VACCINATION_TERM";
pub const ROUTE_OF_VACCINATION_CODE: &str = "ROUTE_OF_VACCINATION_CODE";
pub const ROUTE_OF_VACCINATION_TERM: &str = "ROUTE_OF_VACCINATION_TERM";
pub const DOSE_AMOUNT: &str = "DOSE_AMOUNT";
pub const DOSE_UNIT_CODE: &str = "DOSE_UNIT_CODE";
pub const DOSE_UNIT_TERM: &str = "DOSE_UNIT_TERM";
pub const INDICATION_CODE: &str = "INDICATION_CODE";
pub const LOCATION_CODE: &str = "LOCATION_CODE";
pub const LOCATION_CODE_TYPE_URI: &str = "LOCATION_CODE_TYPE_URI";

pub const EXPECTED_HEADERS: [&str; 34] = [
    NHS_NUMBER,
    PERSON_FORENAME,
    PERSON_SURNAME,
    PERSON_DOB,
    PERSON_GENDER_CODE,
    PERSON_POSTCODE,
    DATE_AND_TIME,
    SITE_CODE,
    SITE_CODE_TYPE_URI,
    UNIQUE_ID,
    UNIQUE_ID_URI,
    ACTION_FLAG,
    PERFORMING_PROFESSIONAL_FORENAME,
    PERFORMING_PROFESSIONAL_SURNAME,
    RECORDED_DATE,
    PRIMARY_SOURCE,
    VACCINATION_PROCEDURE_CODE,
    VACCINATION_PROCEDURE_TERM,
    DOSE_SEQUENCE,
    VACCINE_PRODUCT_CODE,
    VACCINE_PRODUCT_TERM,
    VACCINE_MANUFACTURER,
    BATCH_NUMBER,
    EXPIRY_DATE,
    SITE_OF_VACCINATION_CODE,
    SITE_OF_VACCINATION_TERM,
    ROUTE_OF_VACCINATION_CODE,
    ROUTE_OF_VACCINATION_TERM,
    DOSE_AMOUNT,
    DOSE_UNIT_CODE,
    DOSE_UNIT_TERM,
    INDICATION_CODE,
    LOCATION_CODE,
    LOCATION_CODE_TYPE_URI,
];

/// Columns carrying SNOMED CT concept ids.
pub const SNOMED_CODED: [&str; 6] = [
    VACCINATION_PROCEDURE_CODE,
    VACCINE_PRODUCT_CODE,
    SITE_OF_VACCINATION_CODE,
    ROUTE_OF_VACCINATION_CODE,
    DOSE_UNIT_CODE,
    INDICATION_CODE,
];

/// Location string used in failure reasons for `column`.
pub fn field_location(column: &str) -> String {
    column.to_ascii_lowercase()
}
