//! Pipeline configuration.
//!
//! Loaded from TOML. The file is taken from an explicit path, else from the
//! `IMMS_BATCH_CONFIG` environment variable, else defaults apply.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use imms_ingest::OdsSupplierMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::lookup::StaticPermissionLookup;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "IMMS_BATCH_CONFIG";

/// Default bound on the permission lookup.
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 5_000;

/// Settings for one run of the batch pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Timeout for the permission lookup, in milliseconds.
    pub lookup_timeout_ms: u64,

    /// Supplier → permission strings.
    pub permissions: BTreeMap<String, Vec<String>>,

    /// ODS code → supplier. Replaces the built-in table when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ods_suppliers: Option<BTreeMap<String, String>>,

    /// Directory for acknowledgment files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: DEFAULT_LOOKUP_TIMEOUT_MS,
            permissions: BTreeMap::new(),
            ods_suppliers: None,
            ack_dir: None,
        }
    }
}

/// Permission config file: `{"all_permissions": {"SUPPLIER": [...]}}`.
#[derive(Debug, Clone, Default, Deserialize)]
struct PermissionsFile {
    #[serde(default)]
    all_permissions: BTreeMap<String, Vec<String>>,
}

impl PipelineConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Toml {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content, path)?;
        debug!(path = %path.display(), suppliers = config.permissions.len(), "config loaded");
        Ok(config)
    }

    /// Load from `explicit`, else from [`CONFIG_ENV_VAR`], else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    /// Merge a permissions JSON file into the permission table; entries
    /// from the file replace existing entries for the same supplier.
    pub fn merge_permissions_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: PermissionsFile =
            serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        self.permissions.extend(file.all_permissions);
        Ok(())
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn supplier_map(&self) -> OdsSupplierMap {
        match &self.ods_suppliers {
            Some(entries) => OdsSupplierMap::from_entries(entries.clone()),
            None => OdsSupplierMap::standard(),
        }
    }

    pub fn permission_lookup(&self) -> StaticPermissionLookup {
        StaticPermissionLookup::new(self.permissions.clone())
    }
}
