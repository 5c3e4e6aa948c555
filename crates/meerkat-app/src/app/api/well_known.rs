//! `/.well-known/carddav` bootstrap (RFC 6764).

use meerkat_core::constants::{CARDDAV_ROOT_PATH, WELL_KNOWN_CARDDAV};
use salvo::http::{HeaderValue, StatusCode};
use salvo::{Request, Response, Router, handler};

/// ## Summary
/// Permanently redirects service discovery to the `CardDAV` root, whatever
/// the method.
#[handler]
#[tracing::instrument(skip_all, fields(method = %req.method()))]
pub async fn well_known_carddav(req: &mut Request, res: &mut Response) {
    tracing::debug!(location = CARDDAV_ROOT_PATH, "Redirecting CardDAV discovery");
    res.status_code(StatusCode::PERMANENT_REDIRECT);
    #[expect(
        clippy::let_underscore_must_use,
        reason = "Header addition failure is non-fatal"
    )]
    let _ = res.add_header("Location", HeaderValue::from_static(CARDDAV_ROOT_PATH), true);
}

pub fn routes() -> Router {
    Router::with_path(WELL_KNOWN_CARDDAV.trim_start_matches('/')).goal(well_known_carddav)
}
