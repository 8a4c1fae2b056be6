//! Application error types.

use domain::SaleError;
use sale_store::StoreError;
use thiserror::Error;

use crate::validation::ValidationError;

/// Errors returned by [`crate::SaleService`].
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// The request failed input validation.
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    /// The addressed resource does not exist.
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    /// The request clashes with existing state.
    #[error("{0}")]
    Conflict(String),

    /// The sale aggregate refused the change.
    #[error(transparent)]
    Sale(#[from] SaleError),

    /// The persistence gateway failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApplicationError {
    pub(crate) fn sale_not_found(id: impl ToString) -> Self {
        ApplicationError::NotFound {
            resource: "Sale",
            id: id.to_string(),
        }
    }
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, ApplicationError>;
