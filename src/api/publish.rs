//! Publish endpoint used by backend services.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::hub::UserId;
use crate::notification::{NotifyUserMessage, UnreadCounts, UnreadDeltas};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub message: NotifyUserMessage,
    #[serde(default)]
    pub deltas: UnreadDeltas,
}

/// POST /api/v1/notifications/publish
///
/// Responds with the absolute counters carried by the published envelope.
pub async fn publish_notification(
    State(state): State<AppState>,
    Json(request): Json<PublishRequest>,
) -> Result<Json<UnreadCounts>> {
    if request.user_id.0 <= 0 {
        return Err(AppError::Validation(format!(
            "user_id must be positive, got {}",
            request.user_id
        )));
    }

    let mut message = request.message;
    if message.uid == 0 {
        message.uid = request.user_id.0;
    } else if message.uid != request.user_id.0 {
        return Err(AppError::Validation(format!(
            "message.uid {} does not match user_id {}",
            message.uid, request.user_id
        )));
    }

    let counts = state
        .publisher
        .publish(request.user_id, message, request.deltas)
        .await?;

    tracing::info!(
        user_id = %request.user_id,
        unread_notice_count = counts.unread_notice_count,
        unread_message_count = counts.unread_message_count,
        "Notification published"
    );

    Ok(Json(counts))
}
