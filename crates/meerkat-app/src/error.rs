use salvo::http::StatusCode;
use thiserror::Error;

/// Application-level errors (HTTP layer)
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    ServiceError(#[from] meerkat_service::error::ServiceError),

    #[error(transparent)]
    DatabaseError(#[from] meerkat_db::error::DbError),

    #[error(transparent)]
    RfcError(#[from] meerkat_rfc::error::RfcError),

    #[error(transparent)]
    CoreError(#[from] meerkat_core::error::CoreError),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ServiceError(err) => StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::RfcError(_) => StatusCode::BAD_REQUEST,
            Self::DatabaseError(_) | Self::CoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use meerkat_service::error::ServiceError;

    use super::*;

    #[test]
    fn service_errors_keep_their_status() {
        assert_eq!(
            AppError::from(ServiceError::NotFound("import session".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(ServiceError::NotSupported("mkcol")).status_code(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            AppError::from(meerkat_core::error::CoreError::InvariantViolation("x")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
