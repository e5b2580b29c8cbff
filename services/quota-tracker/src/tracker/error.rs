use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("service {0:?} is not configured for quota tracking")]
    UnknownService(String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
