use thiserror::Error;

use crate::storage::StorageError;

/// Errors surfaced by the service layer.
///
/// `Expired` and `Disabled` redirect outcomes are not errors; they are
/// modeled as `redirect::Resolution` variants.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found")]
    NotFound,

    #[error("short code is already taken")]
    Conflict,

    #[error("{0}")]
    Validation(String),

    /// Fatal configuration problem: the code alphabet is too small for the
    /// current corpus. Surfaced instead of retrying forever.
    #[error("failed to generate a unique short code after {0} attempts; increase the code length")]
    CodeSpaceExhausted(usize),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict => ServiceError::Conflict,
            StorageError::Other(e) => ServiceError::Storage(e),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
