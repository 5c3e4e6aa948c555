//! The `CardDAV` adapter: vCard mapping and address object operations.

pub mod mapper;
pub mod service;

pub use service::{AddressObject, CardDavService, PutObjectResult};
