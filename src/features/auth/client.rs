//! Client wrappers for the auth endpoints. Session cookies and the CSRF header
//! are handled by [`ApiClient`]; these helpers only pick paths and payloads.

use crate::{
    client::{csrf::CSRF_TOKEN_PATH, ApiClient, ApiError},
    features::auth::types::{LoginRequest, LoginResponse, RegisterRequest, User},
};
use serde_json::Value;

pub const LOGIN_PATH: &str = "auth/login/";
pub const REGISTER_PATH: &str = "auth/register/";
pub const LOGOUT_PATH: &str = "auth/logout/";
pub const CURRENT_USER_PATH: &str = "auth/current-user/";

/// Exchanges credentials for a session cookie and the signed-in user.
pub async fn login(api: &ApiClient, request: &LoginRequest<'_>) -> Result<LoginResponse, ApiError> {
    api.post_json(LOGIN_PATH, request).await
}

/// Creates the account and signs it in.
pub async fn register(
    api: &ApiClient,
    request: &RegisterRequest<'_>,
) -> Result<LoginResponse, ApiError> {
    api.post_json(REGISTER_PATH, request).await
}

pub async fn logout(api: &ApiClient) -> Result<(), ApiError> {
    api.post_empty(LOGOUT_PATH).await
}

/// Fetches the current user. Returns `None` when there is no session.
pub async fn fetch_current_user(api: &ApiClient) -> Result<Option<User>, ApiError> {
    api.get_optional_json(CURRENT_USER_PATH).await
}

/// Asks the server to set the `csrftoken` cookie.
pub async fn fetch_csrf_token(api: &ApiClient) -> Result<(), ApiError> {
    api.get_json::<Value>(CSRF_TOKEN_PATH).await.map(drop)
}
