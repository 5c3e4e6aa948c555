//! Meerkat's domain services: the `CardDAV` adapter, photo handling and the
//! CSV/VCF import pipeline.

pub mod auth;
pub mod carddav;
pub mod error;
pub mod import;
pub mod normalize;
pub mod photo;
