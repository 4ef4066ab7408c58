use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl AppError {
    pub fn validation(reason: impl Into<String>) -> Self {
        AppError::Validation(reason.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}
