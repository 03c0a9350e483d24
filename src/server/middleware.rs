use axum::{
    body::Body,
    extract::State,
    http::{header::ORIGIN, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use super::AppState;

/// Header carrying the shared secret for the publish API
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Allow-list entry that admits every origin
pub const ANY_ORIGIN: &str = "*";

/// API Key authentication middleware
/// Validates X-API-Key header against configured api.key
pub async fn api_key_auth(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    // No key configured: the publish API is open (development mode)
    let Some(expected_key) = &state.settings.api.key else {
        return Ok(next.run(req).await);
    };

    let api_key = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match api_key {
        Some(key) if key == expected_key => Ok(next.run(req).await),
        Some(_) => {
            tracing::warn!("Invalid API key provided");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::warn!("Missing API key header");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Check the request's `Origin` against the configured allow-list.
///
/// Browsers always send `Origin` on a WebSocket handshake, so a request
/// without one comes from a non-browser client and is let through. A
/// present origin must match an entry exactly unless the list holds `"*"`.
pub fn origin_allowed(allowed: &[String], headers: &HeaderMap) -> bool {
    let Some(origin) = headers.get(ORIGIN) else {
        return true;
    };
    let Ok(origin) = origin.to_str() else {
        return false;
    };

    allowed
        .iter()
        .any(|entry| entry == ANY_ORIGIN || entry == origin)
}
