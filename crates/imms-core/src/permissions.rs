//! Resolving supplier permission strings into operation sets.

use std::collections::BTreeSet;

use imms_model::{Grant, Operation, Permission, PermissionSet, VaccineType};
use tracing::warn;

/// Parse permission strings, dropping (and logging) malformed entries.
pub fn parse_permissions<S: AsRef<str>>(permission_strings: &[S]) -> Vec<Permission> {
    permission_strings
        .iter()
        .filter_map(|raw| match Permission::parse(raw.as_ref()) {
            Ok(permission) => Some(permission),
            Err(error) => {
                warn!(%error, "ignoring malformed permission");
                None
            }
        })
        .collect()
}

/// Operations granted for `vaccine` by already-parsed permissions.
///
/// A `FULL` grant yields exactly create, update and delete, whatever else
/// is present for the vaccine.
pub fn operations_for(vaccine: VaccineType, permissions: &[Permission]) -> BTreeSet<Operation> {
    let granted: Vec<&Permission> = permissions.iter().filter(|p| p.vaccine == vaccine).collect();
    if granted.iter().any(|p| p.grant == Grant::Full) {
        return Operation::FULL.into_iter().collect();
    }
    granted.iter().flat_map(|p| p.operations()).collect()
}

/// Operations a supplier holding `permission_strings` may perform for
/// `vaccine`. No matching permission gives an empty set.
pub fn get_operation_permissions<S: AsRef<str>>(
    vaccine: VaccineType,
    permission_strings: &[S],
) -> BTreeSet<Operation> {
    operations_for(vaccine, &parse_permissions(permission_strings))
}

/// Build the batch's permission snapshot for every vaccine type.
pub fn resolve_permission_set<S: AsRef<str>>(permission_strings: &[S]) -> PermissionSet {
    let permissions = parse_permissions(permission_strings);
    let mut set = PermissionSet::new();
    for vaccine in VaccineType::ALL {
        set.set_operations(vaccine, operations_for(vaccine, &permissions));
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(list: &[Operation]) -> BTreeSet<Operation> {
        list.iter().copied().collect()
    }

    #[test]
    fn full_grants_exactly_create_update_delete() {
        let perms = ["COVID19_FULL", "COVID19_SEARCH", "COVID19_READ"];
        assert_eq!(
            get_operation_permissions(VaccineType::Covid19, &perms),
            ops(&[Operation::Create, Operation::Update, Operation::Delete])
        );
    }

    #[test]
    fn individual_operations_accumulate() {
        let perms = ["FLU_CREATE", "FLU_read", "COVID19_DELETE"];
        assert_eq!(
            get_operation_permissions(VaccineType::Flu, &perms),
            ops(&[Operation::Create, Operation::Read])
        );
        assert_eq!(
            get_operation_permissions(VaccineType::Covid19, &perms),
            ops(&[Operation::Delete])
        );
    }

    #[test]
    fn no_match_is_empty() {
        let perms = ["FLU_FULL"];
        assert!(get_operation_permissions(VaccineType::Rsv, &perms).is_empty());
        let none: [&str; 0] = [];
        assert!(get_operation_permissions(VaccineType::Rsv, &none).is_empty());
    }

    #[test]
    fn vaccine_prefix_must_match_whole_token() {
        // "COVID19" must not match a hypothetical "COVID19X" grant, and
        // malformed strings are ignored rather than guessed at.
        let perms = ["COVID19X_CREATE", "COVID19_CREATE_EXTRA", "COVID19CREATE"];
        assert!(get_operation_permissions(VaccineType::Covid19, &perms).is_empty());
    }

    #[test]
    fn resolved_set_covers_every_vaccine() {
        let perms = vec!["MMR_FULL".to_string(), "RSV_SEARCH".to_string()];
        let set = resolve_permission_set(&perms);
        assert!(set.contains(VaccineType::Mmr, Operation::Delete));
        assert!(!set.contains(VaccineType::Mmr, Operation::Search));
        assert!(set.contains(VaccineType::Rsv, Operation::Search));
        assert!(!set.contains(VaccineType::Flu, Operation::Create));
        assert_eq!(set.vaccines().count(), 2);
    }
}
