//! Typed supplier permissions.
//!
//! Suppliers are granted permission strings such as `COVID19_CREATE` or
//! `FLU_FULL`. [`Permission::parse`] is the one place that knows this string
//! format; everything downstream works on `(VaccineType, Operation)` pairs.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::error::ModelError;
use crate::operation::Operation;
use crate::vaccine::VaccineType;

/// What a single permission string grants for its vaccine type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grant {
    /// `<VACCINE>_FULL`: create, update and delete.
    Full,
    Operation(Operation),
}

/// A parsed permission string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permission {
    pub vaccine: VaccineType,
    pub grant: Grant,
}

impl Permission {
    /// Parse a `<VACCINE>_<OPERATION>` or `<VACCINE>_FULL` string.
    ///
    /// The vaccine token must match exactly; the suffix is case-insensitive.
    /// Strings with more than one `_` are rejected: no known vaccine token
    /// contains an underscore and the format for one that did is unsettled.
    pub fn parse(value: &str) -> Result<Self, ModelError> {
        let malformed = |reason| ModelError::MalformedPermission {
            value: value.to_string(),
            reason,
        };
        let (vaccine_token, suffix) = value
            .split_once('_')
            .ok_or_else(|| malformed("missing '_' separator"))?;
        if suffix.contains('_') {
            return Err(malformed("more than one '_' separator"));
        }
        let vaccine =
            VaccineType::from_token(vaccine_token).ok_or_else(|| malformed("unknown vaccine type"))?;
        let suffix = suffix.to_ascii_uppercase();
        let grant = if suffix == "FULL" {
            Grant::Full
        } else {
            let operation =
                Operation::from_token(&suffix).ok_or_else(|| malformed("unknown operation"))?;
            Grant::Operation(operation)
        };
        Ok(Self { vaccine, grant })
    }

    /// Operations this permission grants for its vaccine type.
    pub fn operations(&self) -> Vec<Operation> {
        match self.grant {
            Grant::Full => Operation::FULL.to_vec(),
            Grant::Operation(operation) => vec![operation],
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.grant {
            Grant::Full => write!(f, "{}_FULL", self.vaccine),
            Grant::Operation(operation) => write!(f, "{}_{}", self.vaccine, operation),
        }
    }
}

/// Set of `(VaccineType, Operation)` pairs a supplier may perform.
///
/// Built once per batch and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionSet {
    grants: BTreeMap<VaccineType, BTreeSet<Operation>>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the operations held for `vaccine`.
    pub fn set_operations(
        &mut self,
        vaccine: VaccineType,
        operations: impl IntoIterator<Item = Operation>,
    ) {
        let operations: BTreeSet<Operation> = operations.into_iter().collect();
        if operations.is_empty() {
            self.grants.remove(&vaccine);
        } else {
            self.grants.insert(vaccine, operations);
        }
    }

    pub fn contains(&self, vaccine: VaccineType, operation: Operation) -> bool {
        self.grants
            .get(&vaccine)
            .is_some_and(|operations| operations.contains(&operation))
    }

    /// Operations granted for `vaccine` (empty when none).
    pub fn operations_for(&self, vaccine: VaccineType) -> BTreeSet<Operation> {
        self.grants.get(&vaccine).cloned().unwrap_or_default()
    }

    pub fn vaccines(&self) -> impl Iterator<Item = VaccineType> + '_ {
        self.grants.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_operation_and_full() {
        assert_eq!(
            Permission::parse("COVID19_CREATE"),
            Ok(Permission {
                vaccine: VaccineType::Covid19,
                grant: Grant::Operation(Operation::Create),
            })
        );
        assert_eq!(
            Permission::parse("FLU_full").map(|p| p.grant),
            Ok(Grant::Full)
        );
    }

    #[test]
    fn rejects_malformed_strings() {
        for value in [
            "",
            "COVID19",
            "COVID19_",
            "POLIO_CREATE",
            "FLU_PATCH",
            "FLU_CREATE_X",
            "flu_CREATE",
            "FLU_ CREATE",
            "FLU_CREATE ",
        ] {
            assert!(
                matches!(
                    Permission::parse(value),
                    Err(ModelError::MalformedPermission { .. })
                ),
                "expected {value:?} to be rejected"
            );
        }
    }

    #[test]
    fn display_round_trips_wire_format() {
        let permission = Permission::parse("RSV_DELETE").unwrap();
        assert_eq!(permission.to_string(), "RSV_DELETE");
    }

    #[test]
    fn empty_operations_are_not_stored() {
        let mut set = PermissionSet::new();
        set.set_operations(VaccineType::Flu, []);
        assert!(set.is_empty());
        assert!(!set.contains(VaccineType::Flu, Operation::Create));
    }
}
