use meerkat_db::db::store::ContactStore;
use meerkat_db::model::user::User;

use crate::auth::password::verify_password;
use crate::error::{ServiceError, ServiceResult};

/// ## Summary
/// Authenticates HTTP Basic credentials. The login may be the username or
/// the email address.
///
/// ## Errors
/// Returns [`ServiceError::Unauthorized`] for unknown users and wrong
/// passwords alike.
#[tracing::instrument(skip(store, password))]
pub async fn authenticate_basic(
    store: &dyn ContactStore,
    login: &str,
    password: &str,
) -> ServiceResult<User> {
    let Some(user) = store.find_user_by_login(login).await? else {
        tracing::debug!("Unknown login");
        return Err(ServiceError::Unauthorized);
    };

    let hash = user.password_hash.clone();
    let password = password.to_string();
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))??;

    tracing::debug!(user_id = user.id, "Basic authentication succeeded");
    Ok(user)
}

/// ## Summary
/// Resolves the username forwarded by a trusted reverse proxy.
///
/// ## Errors
/// Returns [`ServiceError::Unauthorized`] if the header is empty or names no
/// known user.
#[tracing::instrument(skip(store))]
pub async fn authenticate_proxy(store: &dyn ContactStore, username: &str) -> ServiceResult<User> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ServiceError::Unauthorized);
    }

    store
        .find_user_by_username(username)
        .await?
        .ok_or(ServiceError::Unauthorized)
}
