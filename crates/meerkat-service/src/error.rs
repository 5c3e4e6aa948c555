use meerkat_db::error::DbError;
use thiserror::Error;

use crate::photo::fetch::FetchError;

/// Service layer errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Not authenticated")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not supported: {0}")]
    NotSupported(&'static str),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Remote fetch failed: {0}")]
    RemoteFetchFailed(#[from] FetchError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    RfcError(#[from] meerkat_rfc::error::RfcError),

    #[error(transparent)]
    CoreError(#[from] meerkat_core::error::CoreError),
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => Self::NotFound("record not found".to_string()),
            DbError::PreconditionFailed(reason) => Self::PreconditionFailed(reason.to_string()),
            DbError::Conflict(message) => Self::Conflict(message),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl ServiceError {
    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::PreconditionFailed(_) => 412,
            Self::InvalidInput(_) | Self::UnsupportedFormat(_) | Self::RfcError(_) => 400,
            Self::Conflict(_) => 409,
            Self::NotSupported(_) => 501,
            Self::RemoteFetchFailed(_) => 502,
            Self::Internal(_) | Self::CoreError(_) => 500,
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
