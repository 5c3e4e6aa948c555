//! REPORT method handler: `addressbook-query` and `addressbook-multiget`.

use meerkat_rfc::dav::{Multistatus, PropstatResponse, QName, ReportRequest, Status, parse_report};
use meerkat_service::error::ServiceError;
use salvo::http::StatusCode;
use salvo::{Depot, Request, Response, handler};

use crate::app::api::carddav::properties::Resource;
use crate::app::api::carddav::target::DavTarget;
use crate::app::api::carddav::util::{write_error, write_multistatus};
use crate::depot::{get_target_from_depot, get_user_from_depot};
use crate::error::AppResult;
use crate::state::get_state_from_depot;

/// ## Summary
/// Handles REPORT requests against the address book.
///
/// ## Errors
/// Returns 400 for malformed or unsupported reports, 403 outside the
/// address book or for an unsupported collation.
#[handler]
#[tracing::instrument(skip_all, fields(
    method = "REPORT",
    path = %req.uri().path()
))]
pub async fn report(req: &mut Request, res: &mut Response, depot: &Depot) {
    tracing::info!("Handling REPORT request");

    let body = match req.payload().await {
        Ok(bytes) => bytes.to_vec(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read request body");
            res.status_code(StatusCode::BAD_REQUEST);
            return;
        }
    };

    let request = match parse_report(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to parse REPORT request");
            res.status_code(StatusCode::BAD_REQUEST);
            return;
        }
    };

    match build_report_response(depot, &request).await {
        Ok(multistatus) => write_multistatus(res, &multistatus),
        Err(e) => write_error(res, &e),
    }
}

async fn build_report_response(depot: &Depot, request: &ReportRequest) -> AppResult<Multistatus> {
    let state = get_state_from_depot(depot)?;
    let user = get_user_from_depot(depot)?;
    let target = get_target_from_depot(depot)?;

    if !matches!(target, DavTarget::Collection { .. } | DavTarget::Home { .. }) {
        return Err(ServiceError::Forbidden("REPORT outside the address book".to_string()).into());
    }

    let names = requested_properties(request.properties());
    let mut multistatus = Multistatus::new();

    match request {
        ReportRequest::AddressbookQuery { query, .. } => {
            let objects = state.carddav.query(user, query).await?;
            tracing::debug!(matched = objects.len(), "addressbook-query evaluated");
            for object in &objects {
                multistatus.add_response(Resource::Object(object).selected(user, &names));
            }
        }
        ReportRequest::AddressbookMultiget { hrefs, .. } => {
            for (href, object) in state.carddav.multiget(user, hrefs).await? {
                let response = match object {
                    Some(object) => PropstatResponse {
                        href,
                        ..Resource::Object(&object).selected(user, &names)
                    },
                    None => PropstatResponse::status_only(href, Status::NotFound),
                };
                multistatus.add_response(response);
            }
        }
    }

    Ok(multistatus)
}

/// A REPORT without `<prop>` gets the entity tag and the card.
fn requested_properties(requested: &[QName]) -> Vec<QName> {
    if requested.is_empty() {
        vec![QName::dav("getetag"), QName::carddav("address-data")]
    } else {
        requested.to_vec()
    }
}
