//! DELETE method handler for address objects.

use meerkat_service::error::ServiceError;
use salvo::http::StatusCode;
use salvo::{Depot, Request, Response, handler};

use crate::app::api::carddav::target::DavTarget;
use crate::app::api::carddav::util::{precondition_etag, write_error};
use crate::depot::{get_target_from_depot, get_user_from_depot};
use crate::error::{AppError, AppResult};
use crate::state::get_state_from_depot;

/// ## Summary
/// Soft-deletes an address object.
///
/// ## Side Effects
/// Marks the contact deleted; it disappears from listings and GET.
///
/// ## Errors
/// Returns 404 if the object does not exist, 412 for a stale `If-Match`,
/// 501 for the address book itself and 405 for other collections.
#[handler]
#[tracing::instrument(skip_all, fields(
    method = "DELETE",
    path = %req.uri().path()
))]
pub async fn delete(req: &mut Request, res: &mut Response, depot: &Depot) {
    tracing::info!("Handling DELETE request");

    let if_match = precondition_etag(req, "If-Match");

    match perform_delete(depot, if_match.as_deref()).await {
        Ok(true) => {
            tracing::info!("Resource deleted successfully");
            res.status_code(StatusCode::NO_CONTENT);
        }
        Ok(false) => {
            res.status_code(StatusCode::METHOD_NOT_ALLOWED);
        }
        Err(e) => write_error(res, &e),
    }
}

/// `Ok(false)` when the target cannot be deleted at all.
async fn perform_delete(depot: &Depot, if_match: Option<&str>) -> AppResult<bool> {
    let name = match get_target_from_depot(depot)? {
        DavTarget::Object { name, .. } => name,
        DavTarget::Collection { .. } => {
            return Err(AppError::from(ServiceError::NotSupported(
                "address book deletion",
            )));
        }
        DavTarget::Root | DavTarget::Principal { .. } | DavTarget::Home { .. } => {
            return Ok(false);
        }
    };

    let state = get_state_from_depot(depot)?;
    let user = get_user_from_depot(depot)?;
    state.carddav.delete_object(user, name, if_match).await?;
    Ok(true)
}
