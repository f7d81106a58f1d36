use thiserror::Error;

use crate::content::ContentError;
use crate::domain::validation::FieldError;

/// Errors surfaced by page operations.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("not found: {message}")]
    NotFound { message: String },

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("{} invalid field(s)", errors.len())]
    Validation { errors: Vec<FieldError> },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(errors: Vec<FieldError>) -> Self {
        Self::Validation { errors }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
