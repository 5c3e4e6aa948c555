//! Multistatus response types (RFC 4918 §13).

use super::href::Href;
use super::property::DavProperty;

/// A multistatus body.
#[derive(Debug, Clone, Default)]
pub struct Multistatus {
    pub responses: Vec<PropstatResponse>,
}

impl Multistatus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_response(&mut self, response: PropstatResponse) {
        self.responses.push(response);
    }
}

/// A single `<D:response>`.
#[derive(Debug, Clone)]
pub struct PropstatResponse {
    pub href: Href,
    pub propstats: Vec<Propstat>,
    /// Response-level status, used instead of propstats (e.g. a multiget
    /// href that does not exist).
    pub status: Option<Status>,
}

impl PropstatResponse {
    /// Creates a response splitting found and missing properties into a
    /// 200 and a 404 propstat. Empty groups are omitted.
    #[must_use]
    pub fn with_found_and_not_found(
        href: impl Into<Href>,
        found: Vec<DavProperty>,
        not_found: Vec<DavProperty>,
    ) -> Self {
        let mut propstats = Vec::new();

        if !found.is_empty() {
            propstats.push(Propstat {
                status: Status::Ok,
                properties: found,
            });
        }

        if !not_found.is_empty() {
            propstats.push(Propstat {
                status: Status::NotFound,
                properties: not_found,
            });
        }

        Self {
            href: href.into(),
            propstats,
            status: None,
        }
    }

    /// Creates a response carrying only a status.
    #[must_use]
    pub fn status_only(href: impl Into<Href>, status: Status) -> Self {
        Self {
            href: href.into(),
            propstats: Vec::new(),
            status: Some(status),
        }
    }
}

/// Properties sharing one status.
#[derive(Debug, Clone)]
pub struct Propstat {
    pub status: Status,
    pub properties: Vec<DavProperty>,
}

/// HTTP status inside a multistatus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
    Forbidden,
}

impl Status {
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Forbidden => 403,
            Self::NotFound => 404,
        }
    }

    /// Returns the full status line, e.g. `HTTP/1.1 200 OK`.
    #[must_use]
    pub fn status_line(self) -> String {
        let reason = match self {
            Self::Ok => "OK",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
        };
        format!("HTTP/1.1 {} {reason}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dav::core::QName;

    #[test]
    fn empty_groups_are_omitted() {
        let response = PropstatResponse::with_found_and_not_found(
            "/x",
            Vec::new(),
            vec![DavProperty::empty(QName::dav("foo"))],
        );
        assert_eq!(response.propstats.len(), 1);
        assert_eq!(response.propstats[0].status, Status::NotFound);
    }

    #[test]
    fn status_lines() {
        assert_eq!(Status::Ok.status_line(), "HTTP/1.1 200 OK");
        assert_eq!(Status::NotFound.status_line(), "HTTP/1.1 404 Not Found");
    }
}
