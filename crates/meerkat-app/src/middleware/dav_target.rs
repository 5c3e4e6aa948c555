//! Resolves the `CardDAV` request path and enforces that users only reach
//! their own namespace.

use salvo::Depot;
use salvo::http::{Method, StatusCode};
use tracing::debug;

use crate::app::api::carddav::target::DavTarget;
use crate::depot::{depot_keys, get_user_from_depot};

/// Middleware handler for `CardDAV` path resolution.
///
/// ## Summary
/// Stores the parsed [`DavTarget`] under [`depot_keys::DAV_TARGET`].
/// Unknown paths get 404; paths naming another user get 403.
pub struct DavTargetMiddleware;

#[salvo::async_trait]
impl salvo::Handler for DavTargetMiddleware {
    #[tracing::instrument(skip_all, fields(path = %req.uri().path()))]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        let Some(target) = DavTarget::parse(req.uri().path()) else {
            debug!("Path is outside the CardDAV layout");
            res.status_code(StatusCode::NOT_FOUND);
            ctrl.skip_rest();
            return;
        };

        if req.method() != Method::OPTIONS {
            let user = match get_user_from_depot(depot) {
                Ok(user) => user,
                Err(e) => {
                    debug!(error = %e, "No authenticated user for CardDAV request");
                    res.status_code(StatusCode::UNAUTHORIZED);
                    ctrl.skip_rest();
                    return;
                }
            };
            if let Some(owner) = target.username()
                && owner != user.username
            {
                debug!(owner, username = %user.username, "Path belongs to another user");
                res.status_code(StatusCode::FORBIDDEN);
                ctrl.skip_rest();
                return;
            }
        }

        debug!(target = ?target, "Resolved CardDAV target");
        depot.insert(depot_keys::DAV_TARGET, target);
    }
}
