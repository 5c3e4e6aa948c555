pub mod carddav;
pub mod import;
pub mod well_known;

use salvo::Router;

// Re-export route constants from core
pub use meerkat_core::constants::{
    CARDDAV_ROUTE_COMPONENT, CARDDAV_ROUTE_PREFIX, IMPORT_ROUTE_COMPONENT, IMPORT_ROUTE_PREFIX,
};

/// ## Summary
/// Constructs the API router with all protocol handlers.
///
/// ## Errors
/// Returns an error if any child route handler fails to initialize.
pub fn routes() -> anyhow::Result<Router> {
    Ok(Router::new()
        .push(well_known::routes())
        .push(carddav::routes()?)
        .push(import::routes()))
}
