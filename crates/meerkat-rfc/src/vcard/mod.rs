//! vCard (RFC 6350) support.
//!
//! Cards are parsed into a flat list of properties whose values are kept
//! exactly as they appeared on the wire (unfolded, still escaped). Typed
//! access happens on demand through [`VCardProperty`] accessors, which keeps
//! re-serialization of properties we do not interpret byte-exact.

pub mod build;
pub mod core;
pub mod parse;

pub use build::{serialize, serialize_single};
pub use self::core::{VCard, VCardParameter, VCardProperty, VCardVersion, names};
pub use parse::{ParseError, ParseErrorKind, ParseResult, parse, parse_each, parse_single};
