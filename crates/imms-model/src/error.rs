use thiserror::Error;

/// Errors raised while parsing model values from their wire representation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("unknown vaccine type '{0}'")]
    UnknownVaccineType(String),

    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("invalid action flag '{0}'")]
    InvalidActionFlag(String),

    /// Permission string does not have the `<VACCINE>_<OPERATION|FULL>` shape.
    #[error("malformed permission '{value}': {reason}")]
    MalformedPermission { value: String, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, ModelError>;
