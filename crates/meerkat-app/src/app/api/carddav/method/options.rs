//! OPTIONS method handler for `CardDAV` resources.

use salvo::http::{HeaderValue, StatusCode};
use salvo::{Request, Response, handler};

const ALLOW: &str = "OPTIONS, GET, HEAD, PUT, DELETE, PROPFIND, REPORT";

// Class 1: basic WebDAV. Class 3: RFC 4918 semantics. addressbook: CardDAV.
const DAV: &str = "1, 3, addressbook";

/// ## Summary
/// Advertises the supported methods and DAV compliance classes.
///
/// ## Side Effects
/// Sets the `Allow` and `DAV` headers on the response.
#[handler]
#[tracing::instrument(skip_all, fields(path = %req.uri().path()))]
pub async fn options(req: &mut Request, res: &mut Response) {
    tracing::info!("Handling OPTIONS request");

    #[expect(
        clippy::let_underscore_must_use,
        reason = "Header addition failure is non-fatal"
    )]
    let _ = res.add_header("Allow", HeaderValue::from_static(ALLOW), true);
    #[expect(
        clippy::let_underscore_must_use,
        reason = "Header addition failure is non-fatal"
    )]
    let _ = res.add_header("DAV", HeaderValue::from_static(DAV), true);
    res.status_code(StatusCode::OK);
}
