use std::sync::Arc;

pub use meerkat_core::config::*;
use meerkat_core::error::CoreError;
use salvo::async_trait;

use crate::error::{AppError, AppResult};

pub struct ConfigHandler {
    pub settings: Settings,
}

#[async_trait]
impl salvo::Handler for ConfigHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        let settings: Arc<Settings> = Arc::new(self.settings.clone());
        depot.inject(settings);
    }
}

/// ## Summary
/// Retrieves the application configuration from the depot.
///
/// ## Errors
/// Returns an error if the configuration is not found in the depot.
pub fn get_config_from_depot(depot: &salvo::Depot) -> AppResult<Arc<Settings>> {
    depot.obtain::<Arc<Settings>>().cloned().map_err(|_err| {
        AppError::CoreError(CoreError::InvariantViolation(
            "Configuration not found in depot",
        ))
    })
}

#[cfg(test)]
mod tests {
    use salvo::prelude::*;
    use salvo::test::{ResponseExt, TestClient};

    use super::*;
    use crate::test_support::settings;

    #[handler]
    async fn port(depot: &mut Depot, res: &mut Response) {
        match get_config_from_depot(depot) {
            Ok(settings) => res.render(settings.server.port.to_string()),
            Err(_) => {
                res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
    }

    #[tokio::test]
    async fn settings_reach_handlers() {
        let router = Router::new()
            .hoop(ConfigHandler {
                settings: settings(AuthMethod::Basic, "/tmp"),
            })
            .get(port);

        let mut res = TestClient::get("http://127.0.0.1:5800/").send(router).await;
        assert_eq!(res.take_string().await.unwrap(), "8080");
    }

    #[tokio::test]
    async fn missing_settings_is_an_error() {
        let router = Router::new().get(port);
        let res = TestClient::get("http://127.0.0.1:5800/").send(router).await;
        assert_eq!(res.status_code, Some(StatusCode::INTERNAL_SERVER_ERROR));
    }
}
