//! In-process permission lookup backed by configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;

use crate::error::LookupError;
use crate::ports::PermissionLookup;

/// Permission lookup over a fixed supplier → permission strings table.
///
/// Supplier names are matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticPermissionLookup {
    permissions: BTreeMap<String, Vec<String>>,
}

impl StaticPermissionLookup {
    pub fn new(permissions: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            permissions: permissions
                .into_iter()
                .map(|(supplier, perms)| (supplier.to_ascii_uppercase(), perms))
                .collect(),
        }
    }

    #[must_use]
    pub fn with_supplier<I, S>(mut self, supplier: &str, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions.insert(
            supplier.to_ascii_uppercase(),
            permissions.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn suppliers(&self) -> impl Iterator<Item = &str> {
        self.permissions.keys().map(String::as_str)
    }
}

impl PermissionLookup for StaticPermissionLookup {
    fn lookup_permissions(
        &self,
        supplier: &str,
        _timeout: Duration,
    ) -> Result<Vec<String>, LookupError> {
        let permissions = self
            .permissions
            .get(&supplier.to_ascii_uppercase())
            .cloned()
            .ok_or_else(|| LookupError::NotFound {
                supplier: supplier.to_string(),
            })?;
        debug!(supplier, count = permissions.len(), "permissions found");
        Ok(permissions)
    }
}
