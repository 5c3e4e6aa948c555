//! Shared building blocks for the Meerkat CRM: configuration, route
//! constants and the root error type.

pub mod config;
pub mod constants;
pub mod error;
