//! Conversion of a validated row into a FHIR Immunization resource.
//!
//! Each `decorate_*` function adds one area of the resource. An element is
//! only added when at least one of its source values is non-empty.

use imms_model::columns::{
    BATCH_NUMBER, DATE_AND_TIME, DOSE_AMOUNT, DOSE_SEQUENCE, DOSE_UNIT_CODE, DOSE_UNIT_TERM,
    EXPIRY_DATE, INDICATION_CODE, LOCATION_CODE, LOCATION_CODE_TYPE_URI, NHS_NUMBER,
    PERFORMING_PROFESSIONAL_FORENAME, PERFORMING_PROFESSIONAL_SURNAME, PERSON_DOB,
    PERSON_FORENAME, PERSON_GENDER_CODE, PERSON_POSTCODE, PERSON_SURNAME, PRIMARY_SOURCE,
    RECORDED_DATE, ROUTE_OF_VACCINATION_CODE, ROUTE_OF_VACCINATION_TERM, SITE_CODE,
    SITE_CODE_TYPE_URI, SITE_OF_VACCINATION_CODE, SITE_OF_VACCINATION_TERM, UNIQUE_ID,
    UNIQUE_ID_URI, VACCINATION_PROCEDURE_CODE, VACCINATION_PROCEDURE_TERM, VACCINE_MANUFACTURER,
    VACCINE_PRODUCT_CODE, VACCINE_PRODUCT_TERM,
};
use imms_model::{CsvRow, VaccineType};
use imms_validate::{to_fhir_date, to_fhir_date_time};
use serde_json::{Map, Number, Value, json};

use crate::error::ConversionError;

pub const SNOMED_SYSTEM: &str = "http://snomed.info/sct";
pub const NHS_NUMBER_SYSTEM: &str = "https://fhir.nhs.uk/Id/nhs-number";
pub const NULL_FLAVOUR_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v3-NullFlavor";
pub const VACCINATION_PROCEDURE_URL: &str =
    "https://fhir.hl7.org.uk/StructureDefinition/Extension-UKCore-VaccinationProcedure";

const PATIENT_ID: &str = "Patient1";
const PRACTITIONER_ID: &str = "Practitioner1";
const DOSE_SEQUENCE_NOT_RECORDED: &str = "Dose sequence not recorded";

type Object = Map<String, Value>;

/// Build the Immunization resource for a row whose vaccine type is known.
pub fn convert_to_immunization(
    row: &CsvRow,
    vaccine: VaccineType,
) -> Result<Value, ConversionError> {
    let mut imms = Object::new();
    imms.insert("resourceType".into(), json!("Immunization"));
    imms.insert("status".into(), json!("completed"));

    let mut contained = Vec::new();
    decorate_patient(&mut imms, &mut contained, row)?;
    decorate_immunization(&mut imms, row)?;
    decorate_vaccine(&mut imms, row)?;
    decorate_vaccination(&mut imms, row, vaccine)?;
    decorate_performer(&mut imms, &mut contained, row);
    if !contained.is_empty() {
        imms.insert("contained".into(), Value::Array(contained));
    }

    Ok(Value::Object(imms))
}

fn decorate_patient(
    imms: &mut Object,
    contained: &mut Vec<Value>,
    row: &CsvRow,
) -> Result<(), ConversionError> {
    let values = [
        NHS_NUMBER,
        PERSON_FORENAME,
        PERSON_SURNAME,
        PERSON_DOB,
        PERSON_GENDER_CODE,
        PERSON_POSTCODE,
    ];
    if !any_present(row, &values) {
        return Ok(());
    }

    let mut patient = Object::new();
    patient.insert("resourceType".into(), json!("Patient"));
    patient.insert("id".into(), json!(PATIENT_ID));

    if let Some(nhs_number) = row.non_empty(NHS_NUMBER) {
        patient.insert(
            "identifier".into(),
            json!([{ "system": NHS_NUMBER_SYSTEM, "value": nhs_number }]),
        );
    }
    if let Some(name) = human_name(row, PERSON_SURNAME, PERSON_FORENAME) {
        patient.insert("name".into(), json!([name]));
    }
    if let Some(code) = row.non_empty(PERSON_GENDER_CODE) {
        patient.insert("gender".into(), json!(fhir_gender(code)));
    }
    if let Some(dob) = row.non_empty(PERSON_DOB) {
        let date = to_fhir_date(dob).ok_or(ConversionError::InvalidValue { column: PERSON_DOB })?;
        patient.insert("birthDate".into(), json!(date));
    }
    if let Some(postcode) = row.non_empty(PERSON_POSTCODE) {
        patient.insert("address".into(), json!([{ "postalCode": postcode }]));
    }

    contained.push(Value::Object(patient));
    imms.insert(
        "patient".into(),
        json!({ "reference": format!("#{PATIENT_ID}") }),
    );
    Ok(())
}

fn decorate_immunization(imms: &mut Object, row: &CsvRow) -> Result<(), ConversionError> {
    let identifier = object_of(&[
        ("system", row.non_empty(UNIQUE_ID_URI)),
        ("value", row.non_empty(UNIQUE_ID)),
    ]);
    if let Some(identifier) = identifier {
        imms.insert("identifier".into(), json!([identifier]));
    }

    if let Some(recorded) = row.non_empty(RECORDED_DATE) {
        let date = to_fhir_date(recorded).ok_or(ConversionError::InvalidValue {
            column: RECORDED_DATE,
        })?;
        imms.insert("recorded".into(), json!(date));
    }

    if let Some(value) = row.non_empty(PRIMARY_SOURCE) {
        let primary = if value.eq_ignore_ascii_case("true") {
            true
        } else if value.eq_ignore_ascii_case("false") {
            false
        } else {
            return Err(ConversionError::InvalidValue {
                column: PRIMARY_SOURCE,
            });
        };
        imms.insert("primarySource".into(), json!(primary));
    }

    if let Some(coding) = snomed_coding(row.non_empty(INDICATION_CODE), None) {
        imms.insert("reasonCode".into(), json!([{ "coding": [coding] }]));
    }
    Ok(())
}

fn decorate_vaccine(imms: &mut Object, row: &CsvRow) -> Result<(), ConversionError> {
    let vaccine_code = snomed_coding(
        row.non_empty(VACCINE_PRODUCT_CODE),
        row.non_empty(VACCINE_PRODUCT_TERM),
    )
    .unwrap_or_else(|| {
        json!({
            "system": NULL_FLAVOUR_SYSTEM,
            "code": "NAVU",
            "display": "Not available",
        })
    });
    imms.insert("vaccineCode".into(), json!({ "coding": [vaccine_code] }));

    if let Some(manufacturer) = row.non_empty(VACCINE_MANUFACTURER) {
        imms.insert("manufacturer".into(), json!({ "display": manufacturer }));
    }
    if let Some(batch) = row.non_empty(BATCH_NUMBER) {
        imms.insert("lotNumber".into(), json!(batch));
    }
    if let Some(expiry) = row.non_empty(EXPIRY_DATE) {
        let date = to_fhir_date(expiry).ok_or(ConversionError::InvalidValue {
            column: EXPIRY_DATE,
        })?;
        imms.insert("expirationDate".into(), json!(date));
    }
    Ok(())
}

fn decorate_vaccination(
    imms: &mut Object,
    row: &CsvRow,
    vaccine: VaccineType,
) -> Result<(), ConversionError> {
    if let Some(coding) = snomed_coding(
        row.non_empty(VACCINATION_PROCEDURE_CODE),
        row.non_empty(VACCINATION_PROCEDURE_TERM),
    ) {
        imms.insert(
            "extension".into(),
            json!([{
                "url": VACCINATION_PROCEDURE_URL,
                "valueCodeableConcept": { "coding": [coding] },
            }]),
        );
    }

    if let Some(occurrence) = row.non_empty(DATE_AND_TIME) {
        let date_time = to_fhir_date_time(occurrence).ok_or(ConversionError::InvalidValue {
            column: DATE_AND_TIME,
        })?;
        imms.insert("occurrenceDateTime".into(), json!(date_time));
    }

    if let Some(coding) = snomed_coding(
        row.non_empty(SITE_OF_VACCINATION_CODE),
        row.non_empty(SITE_OF_VACCINATION_TERM),
    ) {
        imms.insert("site".into(), json!({ "coding": [coding] }));
    }
    if let Some(coding) = snomed_coding(
        row.non_empty(ROUTE_OF_VACCINATION_CODE),
        row.non_empty(ROUTE_OF_VACCINATION_TERM),
    ) {
        imms.insert("route".into(), json!({ "coding": [coding] }));
    }

    if any_present(row, &[DOSE_AMOUNT, DOSE_UNIT_CODE, DOSE_UNIT_TERM]) {
        let mut dose = Object::new();
        if let Some(amount) = row.non_empty(DOSE_AMOUNT) {
            let value = number(amount).ok_or(ConversionError::InvalidValue {
                column: DOSE_AMOUNT,
            })?;
            dose.insert("value".into(), Value::Number(value));
        }
        if let Some(unit) = row.non_empty(DOSE_UNIT_TERM) {
            dose.insert("unit".into(), json!(unit));
        }
        if let Some(code) = row.non_empty(DOSE_UNIT_CODE) {
            dose.insert("system".into(), json!(SNOMED_SYSTEM));
            dose.insert("code".into(), json!(code));
        }
        imms.insert("doseQuantity".into(), Value::Object(dose));
    }

    let target_disease: Vec<Value> = vaccine
        .target_diseases()
        .iter()
        .map(|disease| {
            json!({
                "coding": [{
                    "system": SNOMED_SYSTEM,
                    "code": disease.snomed_code(),
                    "display": disease.display_term(),
                }]
            })
        })
        .collect();
    let mut protocol = Object::new();
    protocol.insert("targetDisease".into(), Value::Array(target_disease));
    match row.non_empty(DOSE_SEQUENCE) {
        Some(sequence) => {
            let dose_number = sequence
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConversionError::InvalidValue {
                    column: DOSE_SEQUENCE,
                })?;
            protocol.insert("doseNumberPositiveInt".into(), json!(dose_number));
        }
        None => {
            protocol.insert("doseNumberString".into(), json!(DOSE_SEQUENCE_NOT_RECORDED));
        }
    }
    imms.insert("protocolApplied".into(), json!([protocol]));
    Ok(())
}

fn decorate_performer(imms: &mut Object, contained: &mut Vec<Value>, row: &CsvRow) {
    let mut performer = Vec::new();

    let organization = object_of(&[
        ("system", row.non_empty(SITE_CODE_TYPE_URI)),
        ("value", row.non_empty(SITE_CODE)),
    ]);
    if let Some(identifier) = organization {
        performer.push(json!({
            "actor": { "type": "Organization", "identifier": identifier }
        }));
    }

    if let Some(name) = human_name(
        row,
        PERFORMING_PROFESSIONAL_SURNAME,
        PERFORMING_PROFESSIONAL_FORENAME,
    ) {
        contained.push(json!({
            "resourceType": "Practitioner",
            "id": PRACTITIONER_ID,
            "name": [name],
        }));
        performer.push(json!({
            "actor": { "reference": format!("#{PRACTITIONER_ID}") }
        }));
    }

    if !performer.is_empty() {
        imms.insert("performer".into(), Value::Array(performer));
    }

    let location = object_of(&[
        ("system", row.non_empty(LOCATION_CODE_TYPE_URI)),
        ("value", row.non_empty(LOCATION_CODE)),
    ]);
    if let Some(identifier) = location {
        imms.insert(
            "location".into(),
            json!({ "type": "Location", "identifier": identifier }),
        );
    }
}

// === Helpers ===

fn any_present(row: &CsvRow, columns: &[&str]) -> bool {
    columns.iter().any(|column| row.non_empty(column).is_some())
}

/// Object of the present fields, `None` if all are absent.
fn object_of(fields: &[(&str, Option<&str>)]) -> Option<Value> {
    let object: Object = fields
        .iter()
        .filter_map(|(key, value)| value.map(|v| ((*key).to_string(), json!(v))))
        .collect();
    (!object.is_empty()).then_some(Value::Object(object))
}

fn snomed_coding(code: Option<&str>, display: Option<&str>) -> Option<Value> {
    if code.is_none() && display.is_none() {
        return None;
    }
    let mut coding = Object::new();
    coding.insert("system".into(), json!(SNOMED_SYSTEM));
    if let Some(code) = code {
        coding.insert("code".into(), json!(code));
    }
    if let Some(display) = display {
        coding.insert("display".into(), json!(display));
    }
    Some(Value::Object(coding))
}

fn human_name(row: &CsvRow, family: &str, given: &str) -> Option<Value> {
    let family = row.non_empty(family);
    let given = row.non_empty(given);
    if family.is_none() && given.is_none() {
        return None;
    }
    let mut name = Object::new();
    if let Some(family) = family {
        name.insert("family".into(), json!(family));
    }
    if let Some(given) = given {
        name.insert("given".into(), json!([given]));
    }
    Some(Value::Object(name))
}

fn fhir_gender(code: &str) -> String {
    match code {
        "1" => "male".to_string(),
        "2" => "female".to_string(),
        "9" => "other".to_string(),
        "0" => "unknown".to_string(),
        other => other.to_ascii_lowercase(),
    }
}

/// Integer when the value is integral, otherwise a finite decimal.
fn number(value: &str) -> Option<Number> {
    if let Ok(int) = value.parse::<i64>() {
        return Some(Number::from(int));
    }
    value.parse::<f64>().ok().and_then(Number::from_f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> CsvRow {
        CsvRow::from_pairs(0, pairs.iter().copied())
    }

    #[test]
    fn minimal_row_gets_null_flavour_and_unrecorded_dose() {
        let resource = convert_to_immunization(
            &row(&[(UNIQUE_ID, "ID-1"), (UNIQUE_ID_URI, "https://x.example")]),
            VaccineType::Flu,
        )
        .unwrap();
        assert_eq!(resource["resourceType"], "Immunization");
        assert_eq!(resource["status"], "completed");
        assert_eq!(resource["vaccineCode"]["coding"][0]["code"], "NAVU");
        assert_eq!(
            resource["protocolApplied"][0]["doseNumberString"],
            "Dose sequence not recorded"
        );
        assert_eq!(
            resource["protocolApplied"][0]["targetDisease"][0]["coding"][0]["code"],
            "6142004"
        );
        assert!(resource.get("contained").is_none());
        assert!(resource.get("patient").is_none());
        assert!(resource.get("performer").is_none());
    }

    #[test]
    fn mmr_targets_three_diseases() {
        let resource = convert_to_immunization(&row(&[(DOSE_SEQUENCE, "2")]), VaccineType::Mmr)
            .unwrap();
        let diseases = resource["protocolApplied"][0]["targetDisease"]
            .as_array()
            .unwrap();
        assert_eq!(diseases.len(), 3);
        assert_eq!(resource["protocolApplied"][0]["doseNumberPositiveInt"], 2);
    }

    #[test]
    fn patient_is_contained_and_referenced() {
        let resource = convert_to_immunization(
            &row(&[
                (NHS_NUMBER, "9732928395"),
                (PERSON_SURNAME, "SMITH"),
                (PERSON_FORENAME, "JOHN"),
                (PERSON_GENDER_CODE, "1"),
                (PERSON_DOB, "20080217"),
            ]),
            VaccineType::Rsv,
        )
        .unwrap();
        let patient = &resource["contained"][0];
        assert_eq!(patient["id"], "Patient1");
        assert_eq!(patient["gender"], "male");
        assert_eq!(patient["birthDate"], "2008-02-17");
        assert_eq!(patient["name"][0]["given"][0], "JOHN");
        assert_eq!(patient["identifier"][0]["system"], NHS_NUMBER_SYSTEM);
        assert!(patient.get("address").is_none());
        assert_eq!(resource["patient"]["reference"], "#Patient1");
    }

    #[test]
    fn dose_quantity_keeps_decimal_amounts() {
        let resource = convert_to_immunization(
            &row(&[
                (DOSE_AMOUNT, "0.5"),
                (DOSE_UNIT_CODE, "258773002"),
                (DOSE_UNIT_TERM, "Milliliter (qualifier value)"),
            ]),
            VaccineType::Covid19,
        )
        .unwrap();
        assert_eq!(resource["doseQuantity"]["value"], 0.5);
        assert_eq!(resource["doseQuantity"]["system"], SNOMED_SYSTEM);
    }

    #[test]
    fn unconvertible_value_is_an_error() {
        let err = convert_to_immunization(&row(&[(DATE_AND_TIME, "yesterday")]), VaccineType::Flu)
            .unwrap_err();
        assert_eq!(
            err,
            ConversionError::InvalidValue {
                column: DATE_AND_TIME
            }
        );
    }
}
