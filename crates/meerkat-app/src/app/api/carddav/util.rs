//! Response helpers shared by the `CardDAV` method handlers.

use chrono::{DateTime, Utc};
use meerkat_rfc::dav::{Multistatus, serialize_multistatus};
use salvo::http::{HeaderValue, StatusCode};
use salvo::{Request, Response};

use crate::error::AppError;

/// ## Summary
/// Serializes `multistatus` as a 207 response.
pub fn write_multistatus(res: &mut Response, multistatus: &Multistatus) {
    let xml = match serialize_multistatus(multistatus) {
        Ok(xml) => xml,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize multistatus");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            return;
        }
    };

    res.status_code(StatusCode::MULTI_STATUS);
    #[expect(
        clippy::let_underscore_must_use,
        reason = "Header addition failure is non-fatal"
    )]
    let _ = res.add_header(
        "Content-Type",
        HeaderValue::from_static("application/xml; charset=utf-8"),
        true,
    );
    #[expect(
        clippy::let_underscore_must_use,
        reason = "Write body failure is non-fatal"
    )]
    let _ = res.write_body(xml);
}

/// ## Summary
/// Sets the status for `err`, logging server-side failures.
pub fn write_error(res: &mut Response, err: &AppError) {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    } else {
        tracing::debug!(error = %err, status = %status, "Request rejected");
    }
    res.status_code(status);
}

/// Adds a header whose value comes from data; invalid values are dropped.
pub fn set_header(res: &mut Response, name: &'static str, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            #[expect(
                clippy::let_underscore_must_use,
                reason = "Header addition failure is non-fatal"
            )]
            let _ = res.add_header(name, value, true);
        }
        Err(e) => tracing::warn!(error = %e, header = name, "Dropping invalid header value"),
    }
}

#[must_use]
pub fn quote_etag(etag: &str) -> String {
    format!("\"{etag}\"")
}

/// ## Summary
/// Every entity tag of a precondition header, unquoted. Weak tags compare
/// by their opaque part; `*` is returned as is.
#[must_use]
pub fn precondition_etags(req: &Request, header: &str) -> Vec<String> {
    let Some(value) = req.headers().get(header).and_then(|h| h.to_str().ok()) else {
        return Vec::new();
    };
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.strip_prefix("W/").unwrap_or(v).trim_matches('"').to_string())
        .collect()
}

/// The first entity tag of a precondition header.
#[must_use]
pub fn precondition_etag(req: &Request, header: &str) -> Option<String> {
    precondition_etags(req, header).into_iter().next()
}

/// ## Summary
/// Whether `If-None-Match` matches `etag`, so a GET can answer 304.
#[must_use]
pub fn if_none_match_hits(req: &Request, etag: &str) -> bool {
    precondition_etags(req, "If-None-Match")
        .iter()
        .any(|tag| tag == "*" || tag == etag)
}

/// RFC 7231 `IMF-fixdate`.
#[must_use]
pub fn http_date(value: DateTime<Utc>) -> String {
    value.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
