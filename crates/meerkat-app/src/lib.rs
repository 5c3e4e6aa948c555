//! The Meerkat HTTP server: salvo routing, authentication, and the `CardDAV`
//! and import handlers.

pub mod app;
pub mod config;
pub mod depot;
pub mod error;
pub mod middleware;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
