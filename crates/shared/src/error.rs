use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ItemId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Conflict,
    Internal,
}

/// Error payload returned by the task API the builder talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Maps a bare HTTP status to an error code when the body carried none.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let code = match status {
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            409 => ErrorCode::Conflict,
            400 | 422 => ErrorCode::Validation,
            _ => ErrorCode::Internal,
        };
        Self::new(code, message)
    }
}

/// Hard errors of the item store. Lookups of unknown ids are the only
/// failure a store mutation reports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("item {0} not found")]
    NotFound(ItemId),
}
