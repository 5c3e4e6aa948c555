use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use salvo::Depot;
use salvo::http::{HeaderValue, Method, StatusCode};
use tracing::error;

use meerkat_core::config::AuthMethod;
use meerkat_core::constants::BASIC_AUTH_CHALLENGE;
use meerkat_service::auth::authenticate::{authenticate_basic, authenticate_proxy};
use meerkat_service::error::ServiceError;

use crate::config::get_config_from_depot;
use crate::depot::depot_keys;
use crate::state::get_state_from_depot;

/// ## Summary
/// Authentication middleware that authenticates the request and stores the user in the depot.
/// If authentication fails, a 401 Unauthorized response is returned.
///
/// ## Side Effects
/// Inserts the authenticated [`meerkat_db::model::user::User`] into the depot under
/// [`depot_keys::AUTHENTICATED_USER`]. OPTIONS requests pass through unauthenticated.
///
/// ## Errors
/// Returns an HTTP 401 Unauthorized response if authentication fails.
#[salvo::async_trait]
impl salvo::Handler for AuthMiddleware {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        tracing::trace!("Authenticating request");

        if req.method() == Method::OPTIONS {
            return;
        }

        let config = match get_config_from_depot(depot) {
            Ok(cfg) => cfg,
            Err(e) => {
                error!(error = ?e, "Failed to get config from depot");
                res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
                ctrl.skip_rest();
                return;
            }
        };

        let state = match get_state_from_depot(depot) {
            Ok(state) => state,
            Err(e) => {
                error!(error = ?e, "Failed to get app state from depot");
                res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
                ctrl.skip_rest();
                return;
            }
        };

        let outcome = match config.auth.method {
            AuthMethod::Basic => match basic_credentials(req) {
                Some((login, password)) => {
                    authenticate_basic(state.store.as_ref(), &login, &password).await
                }
                None => Err(ServiceError::Unauthorized),
            },
            AuthMethod::Proxy => {
                let username = req
                    .headers()
                    .get(config.auth.proxy.header.as_str())
                    .and_then(|h| h.to_str().ok())
                    .unwrap_or_default();
                authenticate_proxy(state.store.as_ref(), username).await
            }
        };

        match outcome {
            Ok(user) => {
                tracing::debug!(username = %user.username, "User authenticated successfully");
                depot.insert(depot_keys::AUTHENTICATED_USER, user);
            }
            Err(ServiceError::Unauthorized) => {
                tracing::debug!("Rejecting unauthenticated request");
                res.status_code(StatusCode::UNAUTHORIZED);
                if config.auth.method == AuthMethod::Basic {
                    #[expect(
                        clippy::let_underscore_must_use,
                        reason = "Header addition failure is non-fatal"
                    )]
                    let _ = res.add_header(
                        "WWW-Authenticate",
                        HeaderValue::from_static(BASIC_AUTH_CHALLENGE),
                        true,
                    );
                }
                ctrl.skip_rest();
            }
            Err(service_err) => {
                error!(error = ?service_err, "Authentication failed with error");
                res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
                res.body("Internal Server Error");
                ctrl.skip_rest();
            }
        }
    }
}

/// ## Summary
/// Middleware handler for authentication.
/// Use this as a handler in routes to protect them with authentication.
pub struct AuthMiddleware;

/// Decodes `Authorization: Basic ...` into login and password.
fn basic_credentials(req: &salvo::Request) -> Option<(String, String)> {
    let value = req.headers().get("Authorization")?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (login, password) = decoded.split_once(':')?;
    Some((login.to_string(), password.to_string()))
}
