//! Shared services handed to every request through the depot.

use std::sync::Arc;

use meerkat_core::config::Settings;
use meerkat_core::error::CoreError;
use meerkat_db::db::store::ContactStore;
use meerkat_service::carddav::service::CardDavService;
use meerkat_service::import::{ImportService, ImportSessions};
use meerkat_service::photo::Photos;
use meerkat_service::photo::fetch::ImageFetcher;
use meerkat_service::photo::store::PhotoStore;
use salvo::async_trait;

use crate::error::{AppError, AppResult};

/// Everything a handler needs besides the request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContactStore>,
    pub carddav: CardDavService,
    pub import: ImportService,
}

impl AppState {
    /// ## Summary
    /// Wires the services on top of `store` and `sessions`.
    ///
    /// ## Errors
    /// Returns an error if the remote fetcher or the import validator cannot
    /// be built.
    pub fn build(
        settings: &Settings,
        store: Arc<dyn ContactStore>,
        sessions: Arc<dyn ImportSessions>,
    ) -> AppResult<Self> {
        let fetcher = ImageFetcher::new(&settings.fetch)
            .map_err(meerkat_service::error::ServiceError::from)?;
        let photos = Photos::new(PhotoStore::new(&settings.photos.dir), fetcher);

        Ok(Self {
            carddav: CardDavService::new(Arc::clone(&store), photos.clone()),
            import: ImportService::new(
                Arc::clone(&store),
                sessions,
                photos,
                settings.import.clone(),
            )?,
            store,
        })
    }
}

pub struct StateHandler {
    pub state: Arc<AppState>,
}

#[async_trait]
impl salvo::Handler for StateHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(Arc::clone(&self.state));
    }
}

/// ## Summary
/// Retrieves the shared services from the depot.
///
/// ## Errors
/// Returns an error if the state is not found in the depot.
pub fn get_state_from_depot(depot: &salvo::Depot) -> AppResult<Arc<AppState>> {
    depot
        .obtain::<Arc<AppState>>()
        .cloned()
        .map_err(|_err| {
            AppError::CoreError(CoreError::InvariantViolation("App state not found in depot"))
        })
}
