//! The two HTTP gates: an API key guard for the job endpoints and an HTTP
//! Basic guard for the dashboard. Both run before any core logic.

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use tracing::warn;

use snooze_core::config::AuthConfig;

/// Accepts the key from `x-api-key` or `Authorization: Bearer <key>`.
/// Absent or mismatched → 401 with no further processing.
pub fn require_api_key(
    headers: &HeaderMap,
    auth: &AuthConfig,
) -> Result<(), (StatusCode, Json<Value>)> {
    match extract_api_key(headers) {
        Some(key) if key == auth.api_key => Ok(()),
        _ => {
            warn!("request rejected: missing or invalid API key");
            Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Unauthorized"})),
            ))
        }
    }
}

fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(key) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return Some(key.to_string());
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(String::from)
}

/// HTTP Basic check for the dashboard. Any failure answers 401 with a
/// `WWW-Authenticate: Basic` challenge so browsers prompt for credentials.
pub fn require_dashboard_auth(headers: &HeaderMap, auth: &AuthConfig) -> Result<(), Response> {
    let Some((user, password)) = extract_basic_credentials(headers) else {
        return Err(basic_challenge());
    };

    if user == auth.dashboard_user && password == auth.dashboard_password {
        Ok(())
    } else {
        warn!(%user, "dashboard rejected: bad credentials");
        Err(basic_challenge())
    }
}

/// Decode `Authorization: Basic base64(user:password)`. Returns `None` for a
/// missing header, a non-Basic scheme, bad base64, or a payload without `:`.
fn extract_basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let encoded = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())?
        .strip_prefix("Basic ")?;

    let decoded = BASE64.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

fn basic_challenge() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(
            header::WWW_AUTHENTICATE,
            "Basic realm=\"snooze dashboard\", charset=\"UTF-8\"",
        )],
        Json(json!({"error": "Unauthorized"})),
    )
        .into_response()
}
