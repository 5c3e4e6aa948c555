//! Wire formats spoken by Meerkat: vCard 3.0/4.0 (RFC 6350) and the
//! WebDAV/CardDAV XML bodies (RFC 4918, RFC 6352).

pub mod dav;
pub mod error;
pub mod filter;
pub mod vcard;
