//! Announcement endpoint for every client connected to this process.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct BroadcastResponse {
    pub status: &'static str,
}

/// POST /api/v1/notifications/broadcast
///
/// The JSON object in the body is pushed verbatim to every connection held
/// by this instance. It does not travel over the bus.
pub async fn broadcast_notification(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<BroadcastResponse>)> {
    if !body.is_object() {
        return Err(AppError::Validation(
            "broadcast body must be a JSON object".to_string(),
        ));
    }

    state.hub.broadcast(body.to_string()).await?;
    tracing::info!("Broadcast queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(BroadcastResponse { status: "queued" }),
    ))
}
