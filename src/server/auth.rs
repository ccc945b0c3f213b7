//! API key authentication for the gateway routes.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use super::error::ApiError;
use super::AppState;
use crate::error::BridgeError;

/// Key presented by the caller, from `X-API-Key` or `Authorization: Bearer`.
pub fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(key) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return Some(key.trim());
    }

    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// True when `provided` matches any configured key.
pub fn is_authorized(keys: &[String], provided: &str) -> bool {
    // Every key is compared so timing does not reveal which one matched.
    keys.iter().fold(false, |found, key| {
        constant_time_eq(key.as_bytes(), provided.as_bytes()) | found
    })
}

pub(super) async fn api_key_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match extract_api_key(request.headers()) {
        Some(key) if is_authorized(&state.api_keys, key) => Ok(next.run(request).await),
        Some(_) => Err(BridgeError::Authentication("Invalid API key".into()).into()),
        None => Err(BridgeError::Authentication("Authentication required".into()).into()),
    }
}
