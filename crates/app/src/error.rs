use thiserror::Error;

use tastemark_auth::AuthzError;
use tastemark_core::DomainError;
use tastemark_infra::{BlobError, StoreError};

pub type AppResult<T> = Result<T, AppError>;

/// Failure of a single user action. Nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Blob(#[from] BlobError),
}

/// How a client should surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Show inline next to the form field.
    Validation,
    Denied,
    NotFound,
    Conflict,
    /// Backend call failed; show a blocking alert. Not retried.
    Backend,
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::Domain(DomainError::Validation(_) | DomainError::InvalidId(_)) => ErrorCategory::Validation,
            AppError::Domain(DomainError::Unauthorized) | AppError::Authz(_) => ErrorCategory::Denied,
            AppError::Domain(DomainError::NotFound) => ErrorCategory::NotFound,
            AppError::Domain(DomainError::Conflict(_) | DomainError::InvariantViolation(_)) => {
                ErrorCategory::Conflict
            }
            AppError::Store(StoreError::Precondition(_)) => ErrorCategory::Conflict,
            AppError::Store(_) | AppError::Blob(_) => ErrorCategory::Backend,
        }
    }

    pub fn is_denied(&self) -> bool {
        self.category() == ErrorCategory::Denied
    }

    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }
}
