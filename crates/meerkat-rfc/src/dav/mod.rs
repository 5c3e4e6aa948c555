//! WebDAV (RFC 4918) and CardDAV (RFC 6352) XML request and response types.
//!
//! Only the pieces an address-book server needs: PROPFIND, the two CardDAV
//! REPORTs and the multistatus response body.

pub mod build;
pub mod core;
pub mod parse;

pub use build::serialize_multistatus;
pub use self::core::*;
pub use parse::{parse_propfind, parse_report};
