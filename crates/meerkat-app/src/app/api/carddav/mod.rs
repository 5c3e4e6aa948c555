// CardDAV API handlers.

use salvo::{Router, http::Method, routing::MethodFilter};

use crate::app::api::CARDDAV_ROUTE_COMPONENT;
use crate::middleware::{auth::AuthMiddleware, dav_target::DavTargetMiddleware};

pub mod method;
pub mod properties;
pub mod target;
pub mod util;

/// ## Summary
/// Routes every method of the `CardDAV` namespace.
///
/// ## Errors
/// Returns an error if an extension method name fails to parse.
pub fn routes() -> anyhow::Result<Router> {
    Ok(Router::with_path(CARDDAV_ROUTE_COMPONENT)
        .hoop(AuthMiddleware)
        .hoop(DavTargetMiddleware)
        .push(
            Router::with_path("{**rest}")
                .options(method::options::options)
                .get(method::get_head::get_head)
                .head(method::get_head::get_head)
                .put(method::put::put)
                .delete(method::delete::delete)
                .push(
                    Router::new()
                        .filter(MethodFilter(Method::from_bytes(b"PROPFIND")?))
                        .goal(method::propfind::propfind),
                )
                .push(
                    Router::new()
                        .filter(MethodFilter(Method::from_bytes(b"REPORT")?))
                        .goal(method::report::report),
                )
                .push(
                    Router::new()
                        .filter(MethodFilter(Method::from_bytes(b"MKCOL")?))
                        .goal(method::mkcol::mkcol),
                ),
        ))
}
