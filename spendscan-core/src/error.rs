//! Errors raised at the JSON boundary before any pipeline work starts.

use thiserror::Error;

use crate::outcome::ErrorKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("expected a JSON array of expenses or an object with an \"expenses\" array")]
    NotAnArray,

    #[error("expense #{index} is not a JSON object")]
    NotAnObject { index: usize },

    #[error("expense #{index}: missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("expense #{index}: field `{field}` {reason}")]
    InvalidField {
        index: usize,
        field: &'static str,
        reason: String,
    },
}

impl ValidationError {
    pub fn index(&self) -> Option<usize> {
        match self {
            ValidationError::NotAnArray => None,
            ValidationError::NotAnObject { index }
            | ValidationError::MissingField { index, .. }
            | ValidationError::InvalidField { index, .. } => Some(*index),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ValidationError
    }
}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;
