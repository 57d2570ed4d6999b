use crate::core::validation::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrmError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Model '{0}' not found")]
    ModelNotFound(String),

    #[error("Field '{0}' not found in model '{1}'")]
    FieldNotFound(String, String),

    #[error("Entry #{1} not found in model '{0}'")]
    EntryNotFound(String, i64),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Invalid model definition: {0}")]
    InvalidDefinition(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("{0}")]
    Validation(ValidationError),
}

pub type Result<T> = std::result::Result<T, OrmError>;

impl OrmError {
    /// Returns the validation details when this error carries them.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for OrmError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<std::io::Error> for OrmError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for OrmError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}
