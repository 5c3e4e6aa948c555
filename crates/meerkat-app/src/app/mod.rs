pub mod api;

use std::sync::Arc;

use salvo::Router;

use crate::config::{ConfigHandler, Settings};
use crate::state::{AppState, StateHandler};

/// ## Summary
/// The complete application router: configuration and services injected
/// into every request, then the API routes.
///
/// ## Errors
/// Returns an error if the routes fail to build.
pub fn router(settings: Settings, state: Arc<AppState>) -> anyhow::Result<Router> {
    Ok(Router::new()
        .hoop(ConfigHandler { settings })
        .hoop(StateHandler { state })
        .push(api::routes()?))
}
