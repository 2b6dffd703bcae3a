//! Authentication endpoints.

use super::errors::ApiError;
use super::http::{ApiRequest, HttpClient};
use super::types::{BankResponse, LoginRequest, UserRequest};

const LOGIN_PATH: &str = "/api/user/login";
const REGISTER_PATH: &str = "/api/user";
const VALIDATE_TOKEN_PATH: &str = "/api/user/validate-token";

/// Exchanges credentials for an account payload.
///
/// # Errors
/// Returns transport failures unchanged; domain rejections come back as data.
pub async fn login(
    client: &HttpClient,
    credentials: &LoginRequest,
) -> Result<BankResponse, ApiError> {
    client
        .send_json(ApiRequest::post(LOGIN_PATH).json(credentials)?)
        .await
}

/// Creates a new customer and account.
///
/// # Errors
/// Returns transport failures unchanged; domain rejections come back as data.
pub async fn register(
    client: &HttpClient,
    request: &UserRequest,
) -> Result<BankResponse, ApiError> {
    client
        .send_json(ApiRequest::post(REGISTER_PATH).json(request)?)
        .await
}

/// Checks whether the persisted token is still accepted.
///
/// Never fails: `true` only for a 2xx response, `false` for anything else,
/// transport failures included.
pub async fn verify_token(client: &HttpClient) -> bool {
    match client.send(ApiRequest::get(VALIDATE_TOKEN_PATH)).await {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(kind = %e.kind, error = %e, "token check failed");
            false
        }
    }
}
