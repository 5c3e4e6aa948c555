//! PROPFIND method handler for `CardDAV` resources.

use meerkat_rfc::dav::{Depth, Multistatus, PropfindRequest, parse_propfind};
use salvo::http::StatusCode;
use salvo::{Depot, Request, Response, handler};

use crate::app::api::carddav::properties::Resource;
use crate::app::api::carddav::target::DavTarget;
use crate::app::api::carddav::util::{write_error, write_multistatus};
use crate::depot::{get_target_from_depot, get_user_from_depot};
use crate::error::AppResult;
use crate::state::get_state_from_depot;

/// ## Summary
/// Handles PROPFIND requests for `CardDAV` resources.
///
/// Parses the request body to determine which properties to return and
/// describes the target plus, for `Depth: 1` (or `infinity`), its direct
/// children.
///
/// ## Side Effects
/// Returns a 207 Multi-Status XML response.
///
/// ## Errors
/// Returns 400 for malformed requests, 404 for missing objects, 500 for server errors.
#[handler]
#[tracing::instrument(skip_all, fields(
    method = "PROPFIND",
    path = %req.uri().path()
))]
pub async fn propfind(req: &mut Request, res: &mut Response, depot: &Depot) {
    tracing::info!("Handling PROPFIND request");

    let depth = match req.headers().get("Depth") {
        None => Depth::Zero,
        Some(value) => match value.to_str().ok().and_then(Depth::from_header) {
            Some(depth) => depth,
            None => {
                tracing::debug!(depth = ?value, "Invalid Depth header");
                res.status_code(StatusCode::BAD_REQUEST);
                return;
            }
        },
    };
    tracing::debug!(depth = ?depth, "Depth header parsed");

    let body = match req.payload().await {
        Ok(bytes) => bytes.to_vec(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read request body");
            res.status_code(StatusCode::BAD_REQUEST);
            return;
        }
    };

    // Empty body = allprop
    let propfind_req = match parse_propfind(&body) {
        Ok(req) => req,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to parse PROPFIND request");
            res.status_code(StatusCode::BAD_REQUEST);
            return;
        }
    };

    match build_propfind_response(depot, depth, &propfind_req).await {
        Ok(multistatus) => write_multistatus(res, &multistatus),
        Err(e) => write_error(res, &e),
    }
}

/// ## Summary
/// Describes the depot's target at `depth`.
///
/// ## Errors
/// Returns `NotFound` for an object that does not exist, or the store's
/// error if listing fails.
async fn build_propfind_response(
    depot: &Depot,
    depth: Depth,
    request: &PropfindRequest,
) -> AppResult<Multistatus> {
    let state = get_state_from_depot(depot)?;
    let user = get_user_from_depot(depot)?;
    let target = get_target_from_depot(depot)?;
    let kind = &request.propfind_type;
    let children = depth.includes_children();

    let mut multistatus = Multistatus::new();
    match target {
        DavTarget::Root => multistatus.add_response(Resource::Root.propfind_response(user, kind)),
        DavTarget::Principal { .. } => {
            multistatus.add_response(Resource::Principal.propfind_response(user, kind));
        }
        DavTarget::Home { .. } => {
            multistatus.add_response(Resource::Home.propfind_response(user, kind));
            if children {
                multistatus.add_response(Resource::Collection.propfind_response(user, kind));
            }
        }
        DavTarget::Collection { .. } => {
            multistatus.add_response(Resource::Collection.propfind_response(user, kind));
            if children {
                for object in state.carddav.list_objects(user).await? {
                    multistatus
                        .add_response(Resource::Object(&object).propfind_response(user, kind));
                }
            }
        }
        DavTarget::Object { name, .. } => {
            let object = state.carddav.get_object(user, name).await?;
            multistatus.add_response(Resource::Object(&object).propfind_response(user, kind));
        }
    }

    tracing::debug!(responses = multistatus.responses.len(), "Multistatus response built");
    Ok(multistatus)
}
