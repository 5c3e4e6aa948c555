//! GET and HEAD handlers for address objects.

use meerkat_core::constants::VCARD_CONTENT_TYPE;
use meerkat_service::carddav::service::AddressObject;
use salvo::http::{HeaderValue, Method, StatusCode};
use salvo::{Depot, Request, Response, handler};

use crate::app::api::carddav::target::DavTarget;
use crate::app::api::carddav::util::{
    http_date, if_none_match_hits, quote_etag, set_header, write_error,
};
use crate::depot::{get_target_from_depot, get_user_from_depot};
use crate::error::AppResult;
use crate::state::get_state_from_depot;

/// ## Summary
/// Returns the vCard of an address object. HEAD sends the same headers
/// without the body.
///
/// Answers 304 without a body when `If-None-Match` matches the current
/// `etag`.
///
/// ## Errors
/// Returns 404 for unknown objects and 405 for collections.
#[handler]
#[tracing::instrument(skip_all, fields(
    method = %req.method(),
    path = %req.uri().path()
))]
pub async fn get_head(req: &mut Request, res: &mut Response, depot: &Depot) {
    tracing::info!("Handling GET/HEAD request");
    let is_head = req.method() == Method::HEAD;

    let object = match load_object(depot).await {
        Ok(Some(object)) => object,
        Ok(None) => {
            res.status_code(StatusCode::METHOD_NOT_ALLOWED);
            return;
        }
        Err(e) => {
            write_error(res, &e);
            return;
        }
    };

    if if_none_match_hits(req, &object.etag) {
        tracing::debug!(etag = %object.etag, "If-None-Match matched");
        res.status_code(StatusCode::NOT_MODIFIED);
        set_header(res, "ETag", &quote_etag(&object.etag));
        set_header(res, "Last-Modified", &http_date(object.last_modified));
        return;
    }

    res.status_code(StatusCode::OK);
    #[expect(
        clippy::let_underscore_must_use,
        reason = "Header addition failure is non-fatal"
    )]
    let _ = res.add_header(
        "Content-Type",
        HeaderValue::from_static(VCARD_CONTENT_TYPE),
        true,
    );
    set_header(res, "ETag", &quote_etag(&object.etag));
    set_header(res, "Last-Modified", &http_date(object.last_modified));

    if is_head {
        set_header(res, "Content-Length", &object.content_length().to_string());
    } else {
        #[expect(
            clippy::let_underscore_must_use,
            reason = "Write body failure is non-fatal"
        )]
        let _ = res.write_body(object.data);
    }
}

/// `None` when the target is not an address object.
async fn load_object(depot: &Depot) -> AppResult<Option<AddressObject>> {
    let target = get_target_from_depot(depot)?;
    let DavTarget::Object { name, .. } = target else {
        return Ok(None);
    };
    let state = get_state_from_depot(depot)?;
    let user = get_user_from_depot(depot)?;
    Ok(Some(state.carddav.get_object(user, name).await?))
}
