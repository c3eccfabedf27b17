//! Row classification: requested operation and authorization.

use imms_model::columns::{self, ACTION_FLAG};
use imms_model::{ActionFlag, CsvRow, FailureReason, Operation, PermissionSet, VaccineType};

/// Requested action of a row and whether the supplier may perform it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub action: ActionFlag,
    pub operation: Operation,
    pub vaccine: VaccineType,
    pub authorized: bool,
}

impl Classification {
    /// Permission string the supplier would need, e.g. `COVID19_UPDATE`.
    pub fn required_permission(&self) -> String {
        format!("{}_{}", self.vaccine, self.operation)
    }

    /// Reason for an unauthorized row; `None` when authorized.
    pub fn denial_reason(&self) -> Option<FailureReason> {
        (!self.authorized).then(|| {
            FailureReason::new(
                columns::field_location(ACTION_FLAG),
                format!(
                    "No permissions for requested operation: {} requires permission {}",
                    self.action,
                    self.required_permission()
                ),
            )
        })
    }
}

/// Row's `ACTION_FLAG` is missing or not one of NEW, UPDATE, DELETE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidActionFlag {
    /// Raw flag value, empty when the column is blank.
    pub raw: String,
}

impl InvalidActionFlag {
    pub fn reason(&self) -> FailureReason {
        FailureReason::new(
            columns::field_location(ACTION_FLAG),
            "invalid or missing action flag: ACTION_FLAG must be 'NEW', 'UPDATE' or 'DELETE'",
        )
    }
}

/// Determine the requested operation of `row` and check it against the
/// batch permissions for `vaccine`.
pub fn classify(
    row: &CsvRow,
    vaccine: VaccineType,
    permissions: &PermissionSet,
) -> Result<Classification, InvalidActionFlag> {
    let raw = row.get(ACTION_FLAG).unwrap_or_default();
    let action = ActionFlag::parse(raw).map_err(|_| InvalidActionFlag {
        raw: raw.to_string(),
    })?;
    let operation = action.operation();
    Ok(Classification {
        action,
        operation,
        vaccine,
        authorized: permissions.contains(vaccine, operation),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permissions(vaccine: VaccineType, operations: &[Operation]) -> PermissionSet {
        let mut set = PermissionSet::new();
        set.set_operations(vaccine, operations.iter().copied());
        set
    }

    fn row(flag: &str) -> CsvRow {
        CsvRow::from_pairs(0, [(ACTION_FLAG, flag)])
    }

    #[test]
    fn new_maps_to_create() {
        let set = permissions(VaccineType::Flu, &[Operation::Create]);
        let result = classify(&row("NEW"), VaccineType::Flu, &set).unwrap();
        assert_eq!(result.operation, Operation::Create);
        assert!(result.authorized);
        assert!(result.denial_reason().is_none());
    }

    #[test]
    fn unauthorized_names_missing_permission() {
        let set = permissions(VaccineType::Covid19, &[Operation::Create]);
        let result = classify(&row("UPDATE"), VaccineType::Covid19, &set).unwrap();
        assert!(!result.authorized);
        let reason = result.denial_reason().unwrap();
        assert_eq!(reason.field_location, "action_flag");
        assert!(reason.message.contains("COVID19_UPDATE"));
    }

    #[test]
    fn permission_for_other_vaccine_does_not_authorize() {
        let set = permissions(VaccineType::Flu, &Operation::FULL);
        let result = classify(&row("DELETE"), VaccineType::Rsv, &set).unwrap();
        assert!(!result.authorized);
    }

    #[test]
    fn action_flag_is_case_sensitive() {
        let set = permissions(VaccineType::Flu, &Operation::FULL);
        for flag in ["new", "Update", "", " DELETE", "CREATE"] {
            let err = classify(&row(flag), VaccineType::Flu, &set).unwrap_err();
            assert_eq!(err.raw, flag);
        }
        let missing = CsvRow::from_pairs(0, [("UNIQUE_ID", "1")]);
        assert!(classify(&missing, VaccineType::Flu, &set).is_err());
    }
}
