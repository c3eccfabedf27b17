use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// CRUD-like action a supplier may perform on an immunisation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
    Search,
    Read,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Create,
        Operation::Update,
        Operation::Delete,
        Operation::Search,
        Operation::Read,
    ];

    /// Operations implied by a `<VACCINE>_FULL` grant.
    pub const FULL: [Operation; 3] = [Operation::Create, Operation::Update, Operation::Delete];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "CREATE",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
            Operation::Search => "SEARCH",
            Operation::Read => "READ",
        }
    }
    /// Exact, case-sensitive match against the wire token.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == token)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Self::from_token(&normalized).ok_or_else(|| ModelError::UnknownOperation(s.to_string()))
    }
}

/// Value of the `ACTION_FLAG` column.
///
/// Matching is exact and case-sensitive: only `NEW`, `UPDATE` and `DELETE`
/// are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionFlag {
    New,
    Update,
    Delete,
}

impl ActionFlag {
    pub fn parse(value: &str) -> Result<Self, ModelError> {
        match value {
            "NEW" => Ok(ActionFlag::New),
            "UPDATE" => Ok(ActionFlag::Update),
            "DELETE" => Ok(ActionFlag::Delete),
            other => Err(ModelError::InvalidActionFlag(other.to_string())),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            ActionFlag::New => "NEW",
            ActionFlag::Update => "UPDATE",
            ActionFlag::Delete => "DELETE",
        }
    }

    /// The operation this flag requests (`NEW` maps to `CREATE`).
    pub const fn operation(&self) -> Operation {
        match self {
            ActionFlag::New => Operation::Create,
            ActionFlag::Update => Operation::Update,
            ActionFlag::Delete => Operation::Delete,
        }
    }
}

impl fmt::Display for ActionFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
