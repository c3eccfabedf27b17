//! Vaccine types and the diseases they target.
//!
//! The disease codes are SNOMED CT concept ids from the IPS target-disease
//! value set; the display terms are the ones the FHIR API expects.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Vaccine type a batch file or record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VaccineType {
    #[serde(rename = "COVID19")]
    Covid19,
    #[serde(rename = "FLU")]
    Flu,
    #[serde(rename = "HPV")]
    Hpv,
    #[serde(rename = "MMR")]
    Mmr,
    #[serde(rename = "RSV")]
    Rsv,
}

impl VaccineType {
    pub const ALL: [VaccineType; 5] = [
        VaccineType::Covid19,
        VaccineType::Flu,
        VaccineType::Hpv,
        VaccineType::Mmr,
        VaccineType::Rsv,
    ];

    /// Token used in file keys and permission strings.
    pub const fn as_str(&self) -> &'static str {
        match self {
            VaccineType::Covid19 => "COVID19",
            VaccineType::Flu => "FLU",
            VaccineType::Hpv => "HPV",
            VaccineType::Mmr => "MMR",
            VaccineType::Rsv => "RSV",
        }
    }

    /// Exact, case-sensitive match against the wire token.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|vaccine| vaccine.as_str() == token)
    }

    /// Diseases targeted by this vaccine type, in a stable order.
    pub fn target_diseases(&self) -> &'static [Disease] {
        match self {
            VaccineType::Covid19 => &[Disease::Covid19],
            VaccineType::Flu => &[Disease::Flu],
            VaccineType::Hpv => &[Disease::Hpv],
            VaccineType::Mmr => &[Disease::Measles, Disease::Mumps, Disease::Rubella],
            VaccineType::Rsv => &[Disease::Rsv],
        }
    }
}

impl fmt::Display for VaccineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VaccineType {
    type Err = ModelError;

    /// Lenient parse for user input: trims and ignores case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Self::from_token(&normalized).ok_or_else(|| ModelError::UnknownVaccineType(s.to_string()))
    }
}

/// Disease targeted by a vaccination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disease {
    Covid19,
    Flu,
    Hpv,
    Measles,
    Mumps,
    Rubella,
    Rsv,
}

impl Disease {
    /// SNOMED CT concept id for the disease.
    pub const fn snomed_code(&self) -> &'static str {
        match self {
            Disease::Covid19 => "840539006",
            Disease::Flu => "6142004",
            Disease::Hpv => "240532009",
            Disease::Measles => "14189004",
            Disease::Mumps => "36989005",
            Disease::Rubella => "36653000",
            Disease::Rsv => "55735004",
        }
    }

    pub const fn display_term(&self) -> &'static str {
        match self {
            Disease::Covid19 => "Disease caused by severe acute respiratory syndrome coronavirus 2",
            Disease::Flu => "Influenza",
            Disease::Hpv => "Human papillomavirus infection",
            Disease::Measles => "Measles",
            Disease::Mumps => "Mumps",
            Disease::Rubella => "Rubella",
            Disease::Rsv => "Respiratory syncytial virus infection (disorder)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_token_is_case_sensitive() {
        assert_eq!(VaccineType::from_token("COVID19"), Some(VaccineType::Covid19));
        assert_eq!(VaccineType::from_token("covid19"), None);
    }

    #[test]
    fn from_str_is_lenient() {
        assert_eq!(" flu ".parse::<VaccineType>(), Ok(VaccineType::Flu));
        assert!(matches!(
            "POLIO".parse::<VaccineType>(),
            Err(ModelError::UnknownVaccineType(_))
        ));
    }

    #[test]
    fn mmr_targets_three_diseases() {
        let codes: Vec<_> = VaccineType::Mmr
            .target_diseases()
            .iter()
            .map(Disease::snomed_code)
            .collect();
        assert_eq!(codes, vec!["14189004", "36989005", "36653000"]);
    }
}
