//! Batch file date formats and their FHIR equivalents.
//!
//! Dates are `YYYYMMDD`. Date-times are `YYYYMMDDThhmmss`, optionally
//! followed by `00` (UTC) or `01` (BST); no suffix means UTC.

use chrono::{NaiveDate, NaiveDateTime};

/// Convert a `YYYYMMDD` date to `YYYY-MM-DD`. `None` if not a real date.
pub fn to_fhir_date(value: &str) -> Option<String> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .ok()
        .map(|date| date.format("%Y-%m-%d").to_string())
}

/// Convert a batch date-time to FHIR `YYYY-MM-DDThh:mm:ss+hh:mm`.
pub fn to_fhir_date_time(value: &str) -> Option<String> {
    let (base, offset) = match value.len() {
        15 => (value, "+00:00"),
        17 => match value.get(15..)? {
            "00" => (value.get(..15)?, "+00:00"),
            "01" => (value.get(..15)?, "+01:00"),
            _ => return None,
        },
        _ => return None,
    };
    let shape_ok = base.bytes().enumerate().all(|(idx, byte)| {
        if idx == 8 {
            byte == b'T'
        } else {
            byte.is_ascii_digit()
        }
    });
    if !shape_ok {
        return None;
    }
    NaiveDateTime::parse_from_str(base, "%Y%m%dT%H%M%S")
        .ok()
        .map(|dt| format!("{}{offset}", dt.format("%Y-%m-%dT%H:%M:%S")))
}

pub fn is_valid_date(value: &str) -> bool {
    to_fhir_date(value).is_some()
}

pub fn is_valid_date_time(value: &str) -> bool {
    to_fhir_date_time(value).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_dates() {
        assert_eq!(to_fhir_date("20080217").as_deref(), Some("2008-02-17"));
        assert_eq!(to_fhir_date("20080230"), None);
        assert_eq!(to_fhir_date("2008-02-17"), None);
        assert_eq!(to_fhir_date("2008021"), None);
    }

    #[test]
    fn converts_date_times() {
        assert_eq!(
            to_fhir_date_time("20240904T183325").as_deref(),
            Some("2024-09-04T18:33:25+00:00")
        );
        assert_eq!(
            to_fhir_date_time("20240904T18332500").as_deref(),
            Some("2024-09-04T18:33:25+00:00")
        );
        assert_eq!(
            to_fhir_date_time("20240904T18332501").as_deref(),
            Some("2024-09-04T18:33:25+01:00")
        );
        assert_eq!(to_fhir_date_time("20240904T18332502"), None);
        assert_eq!(to_fhir_date_time("20240904 183325"), None);
        assert_eq!(to_fhir_date_time("20240904T253325"), None);
        assert_eq!(to_fhir_date_time("é0240904T183325"), None);
    }
}
