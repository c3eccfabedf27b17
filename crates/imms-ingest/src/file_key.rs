//! Batch file key parsing.
//!
//! A file key looks like `FLU_Vaccinations_v5_YGM41_20240708T12130100.csv`:
//! vaccine type, the literal `Vaccinations`, a version, the sender's ODS code
//! and a timestamp, separated by underscores, then a `CSV` or `DAT`
//! extension. Comparison is case-insensitive.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use imms_model::VaccineType;
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

pub const VALID_VERSIONS: &[&str] = &["V5"];
pub const VALID_EXTENSIONS: &[&str] = &["CSV", "DAT"];

const STANDARD_ODS_SUPPLIERS: &[(&str, &str)] = &[
    ("YGM41", "EMIS"),
    ("8J1100001", "PINNACLE"),
    ("8HK48", "SONAR"),
    ("YGA", "TPP"),
    ("0DE", "AGEM-NIVS"),
    ("0DF", "NIMS"),
    ("8HA94", "EVA"),
    ("X26", "RAVS"),
    ("YGMYH", "MEDICAL_DIRECTOR"),
    ("W00", "WELSH_DA_1"),
    ("W000", "WELSH_DA_2"),
    ("ZT001", "NORTHERN_IRELAND_DA"),
    ("YA7", "SCOTLAND_DA"),
    ("N2N9I", "COVID19_VACCINE_RESOLUTION_SERVICEDESK"),
    ("YGJ", "EMIS"),
    ("DPSREDUCED", "DPSREDUCED"),
    ("DPSFULL", "DPSFULL"),
];

/// Mapping from sender ODS code to supplier name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OdsSupplierMap {
    entries: BTreeMap<String, String>,
}

impl Default for OdsSupplierMap {
    fn default() -> Self {
        Self::standard()
    }
}

impl OdsSupplierMap {
    /// The built-in ODS code table.
    pub fn standard() -> Self {
        Self::from_entries(
            STANDARD_ODS_SUPPLIERS
                .iter()
                .map(|(ods, supplier)| ((*ods).to_string(), (*supplier).to_string())),
        )
    }

    /// Build a map; ODS codes are stored upper-cased.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(ods, supplier)| (ods.to_ascii_uppercase(), supplier))
                .collect(),
        }
    }

    pub fn supplier_for(&self, ods_code: &str) -> Option<&str> {
        self.entries
            .get(&ods_code.to_ascii_uppercase())
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(ods, supplier)| (ods.as_str(), supplier.as_str()))
    }
}

/// A parsed, valid file key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileKey {
    key: String,
    pub vaccine_type: VaccineType,
    pub version: String,
    pub ods_code: String,
    pub supplier: String,
    pub timestamp: String,
    pub extension: String,
}

impl FileKey {
    /// Parse and validate `key` against the naming convention.
    pub fn parse(key: &str, suppliers: &OdsSupplierMap) -> Result<Self> {
        let invalid = |reason| IngestError::InvalidFileKey {
            key: key.to_string(),
            reason,
        };

        let (stem, extension) = key.split_once('.').ok_or_else(|| invalid("missing extension"))?;
        if extension.contains(['.', '_']) || stem.contains('.') {
            return Err(invalid("invalid file key format"));
        }
        let parts: Vec<&str> = stem.split('_').collect();
        let [vaccine, vaccinations, version, ods_code, timestamp] = parts.as_slice() else {
            return Err(invalid("invalid file key format"));
        };

        let vaccine_type = VaccineType::from_token(&vaccine.to_ascii_uppercase())
            .ok_or_else(|| invalid("unknown vaccine type"))?;
        if !vaccinations.eq_ignore_ascii_case("VACCINATIONS") {
            return Err(invalid("second part must be 'Vaccinations'"));
        }
        let version = version.to_ascii_uppercase();
        if !VALID_VERSIONS.contains(&version.as_str()) {
            return Err(invalid("unsupported version"));
        }
        let supplier = suppliers
            .supplier_for(ods_code)
            .ok_or_else(|| invalid("unknown ODS code"))?
            .to_string();
        let timestamp = timestamp.to_ascii_uppercase();
        if !is_valid_timestamp(&timestamp) {
            return Err(invalid("invalid timestamp"));
        }
        let extension = extension.to_ascii_uppercase();
        if !VALID_EXTENSIONS.contains(&extension.as_str()) {
            return Err(invalid("extension must be CSV or DAT"));
        }

        Ok(Self {
            key: key.to_string(),
            vaccine_type,
            version,
            ods_code: ods_code.to_ascii_uppercase(),
            supplier,
            timestamp,
            extension,
        })
    }

    /// The key as given.
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// The key without its extension.
    pub fn stem(&self) -> &str {
        self.key.split_once('.').map_or(self.key.as_str(), |(stem, _)| stem)
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// `YYYYMMDDTHHMMSS` followed by anything (usually a timezone suffix).
pub fn is_valid_timestamp(timestamp: &str) -> bool {
    timestamp
        .get(..15)
        .is_some_and(|base| NaiveDateTime::parse_from_str(base, "%Y%m%dT%H%M%S").is_ok())
}
