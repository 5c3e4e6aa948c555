//! Depot keys and typed accessors for request-scoped values.

use meerkat_core::error::CoreError;
use meerkat_db::model::user::User;
use meerkat_service::error::ServiceError;

use crate::app::api::carddav::target::DavTarget;
use crate::error::{AppError, AppResult};

pub mod depot_keys {
    pub const AUTHENTICATED_USER: &str = "__authenticated_user";
    pub const DAV_TARGET: &str = "__dav_target";
}

/// Get the authenticated user from the depot.
///
/// ## Errors
///
/// Returns `Unauthorized` if the auth middleware did not run or let the
/// request through anonymously.
pub fn get_user_from_depot(depot: &salvo::Depot) -> AppResult<&User> {
    depot
        .get::<User>(depot_keys::AUTHENTICATED_USER)
        .map_err(|_e| ServiceError::Unauthorized.into())
}

/// Get the resolved `CardDAV` target from the depot.
///
/// ## Errors
///
/// Returns an invariant violation if the target middleware did not run.
pub fn get_target_from_depot(depot: &salvo::Depot) -> AppResult<&DavTarget> {
    depot
        .get::<DavTarget>(depot_keys::DAV_TARGET)
        .map_err(|_e| {
            AppError::CoreError(CoreError::InvariantViolation("DAV target not found in depot"))
        })
}
