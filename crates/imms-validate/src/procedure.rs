//! Vaccination procedure code table.
//!
//! Maps SNOMED CT vaccination procedure codes to the vaccine type they
//! record. Codes absent from the table are a validation failure, not a
//! system error.

use std::collections::BTreeMap;

use imms_model::VaccineType;

const STANDARD_CODES: &[(&str, VaccineType)] = &[
    ("1324671000000103", VaccineType::Covid19),
    ("1324681000000101", VaccineType::Covid19),
    ("1324691000000104", VaccineType::Covid19),
    ("1362591000000103", VaccineType::Covid19),
    ("1363791000000101", VaccineType::Covid19),
    ("1363831000000108", VaccineType::Covid19),
    ("1363861000000103", VaccineType::Covid19),
    ("822851000000102", VaccineType::Flu),
    ("884861000000100", VaccineType::Flu),
    ("428741008", VaccineType::Hpv),
    ("38598009", VaccineType::Mmr),
    ("956951000000104", VaccineType::Rsv),
];

/// Lookup table from procedure code to vaccine type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureCodeTable {
    codes: BTreeMap<String, VaccineType>,
}

impl Default for ProcedureCodeTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl ProcedureCodeTable {
    /// The built-in table.
    pub fn standard() -> Self {
        Self {
            codes: STANDARD_CODES
                .iter()
                .map(|(code, vaccine)| ((*code).to_string(), *vaccine))
                .collect(),
        }
    }

    /// An empty table, mainly for tests and fully configured deployments.
    pub fn empty() -> Self {
        Self {
            codes: BTreeMap::new(),
        }
    }

    /// Add or replace a mapping.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>, vaccine: VaccineType) -> Self {
        self.codes.insert(code.into(), vaccine);
        self
    }

    pub fn vaccine_type_for(&self, code: &str) -> Option<VaccineType> {
        self.codes.get(code).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, VaccineType)> {
        self.codes.iter().map(|(code, vaccine)| (code.as_str(), *vaccine))
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snomed::is_valid_simple_snomed;

    #[test]
    fn standard_codes_are_valid_snomed() {
        for (code, _) in ProcedureCodeTable::standard().iter() {
            assert!(is_valid_simple_snomed(code), "{code} fails SNOMED validation");
        }
    }

    #[test]
    fn lookup() {
        let table = ProcedureCodeTable::standard();
        assert_eq!(
            table.vaccine_type_for("956951000000104"),
            Some(VaccineType::Rsv)
        );
        assert_eq!(table.vaccine_type_for("mockFLUcode1"), None);
    }

    #[test]
    fn with_code_extends_table() {
        let table = ProcedureCodeTable::empty().with_code("123456001", VaccineType::Flu);
        assert_eq!(table.len(), 1);
        assert_eq!(table.vaccine_type_for("123456001"), Some(VaccineType::Flu));
    }
}
