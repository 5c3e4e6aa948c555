//! MKCOL method handler. Every user has exactly one address book.

use meerkat_service::error::ServiceError;
use salvo::{Request, Response, handler};

use crate::app::api::carddav::util::write_error;
use crate::error::AppError;

/// ## Summary
/// Rejects address-book creation.
///
/// ## Errors
/// Always responds 501 Not Implemented.
#[handler]
#[tracing::instrument(skip_all, fields(method = "MKCOL", path = %req.uri().path()))]
pub async fn mkcol(req: &mut Request, res: &mut Response) {
    tracing::info!("Handling MKCOL request");
    write_error(
        res,
        &AppError::from(ServiceError::NotSupported("address book creation")),
    );
}
