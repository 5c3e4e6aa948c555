//! PUT method handler for address objects.

use meerkat_db::db::store::PutConditions;
use meerkat_service::carddav::service::PutObjectResult;
use salvo::http::StatusCode;
use salvo::{Depot, Request, Response, handler};

use crate::app::api::carddav::target::DavTarget;
use crate::app::api::carddav::util::{
    precondition_etag, precondition_etags, quote_etag, set_header, write_error,
};
use crate::depot::{get_target_from_depot, get_user_from_depot};
use crate::error::AppResult;
use crate::state::get_state_from_depot;

/// Cards carry photos inline, so the cap is generous.
pub const MAX_VCARD_BYTES: usize = 10 * 1024 * 1024;

const ACCEPTED_CONTENT_TYPES: [&str; 2] = ["text/vcard", "text/x-vcard"];

/// ## Summary
/// Creates or replaces an address object from a vCard body.
///
/// ## Side Effects
/// Writes the contact and, when the card carries a photo, the photo files.
///
/// ## Errors
/// Returns 415 for non-vCard bodies, 413 for oversized ones, 400 for
/// unparseable cards, 412 when `If-Match`/`If-None-Match` do not hold and
/// 405 when the target is not an object.
#[handler]
#[tracing::instrument(skip_all, fields(
    method = "PUT",
    path = %req.uri().path()
))]
pub async fn put(req: &mut Request, res: &mut Response, depot: &Depot) {
    tracing::info!("Handling PUT request");

    let name = match get_target_from_depot(depot) {
        Ok(DavTarget::Object { name, .. }) => name.clone(),
        Ok(_) => {
            res.status_code(StatusCode::METHOD_NOT_ALLOWED);
            return;
        }
        Err(e) => {
            write_error(res, &e);
            return;
        }
    };

    if !is_vcard(req) {
        tracing::debug!("Rejecting non-vCard body");
        res.status_code(StatusCode::UNSUPPORTED_MEDIA_TYPE);
        return;
    }

    if req
        .headers()
        .get("Content-Length")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .is_some_and(|len| len > MAX_VCARD_BYTES)
    {
        res.status_code(StatusCode::PAYLOAD_TOO_LARGE);
        return;
    }

    let conditions = PutConditions {
        if_match: precondition_etag(req, "If-Match"),
        if_none_match: precondition_etags(req, "If-None-Match"),
    };

    let body = match req.payload_with_max_size(MAX_VCARD_BYTES).await {
        Ok(bytes) => bytes.to_vec(),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to read request body");
            res.status_code(StatusCode::BAD_REQUEST);
            return;
        }
    };

    match store_object(depot, &name, &body, conditions).await {
        Ok(result) => {
            res.status_code(if result.created {
                StatusCode::CREATED
            } else {
                StatusCode::NO_CONTENT
            });
            set_header(res, "ETag", &quote_etag(&result.etag));
            if result.created {
                set_header(res, "Location", &result.href);
            }
        }
        Err(e) => write_error(res, &e),
    }
}

async fn store_object(
    depot: &Depot,
    name: &str,
    body: &[u8],
    conditions: PutConditions,
) -> AppResult<PutObjectResult> {
    let state = get_state_from_depot(depot)?;
    let user = get_user_from_depot(depot)?;
    Ok(state.carddav.put_object(user, name, body, conditions).await?)
}

fn is_vcard(req: &Request) -> bool {
    let Some(content_type) = req
        .headers()
        .get("Content-Type")
        .and_then(|h| h.to_str().ok())
    else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ACCEPTED_CONTENT_TYPES.contains(&essence.as_str())
}
