use std::fmt::Display;

use axum::{
    extract::{ws::Message, Query, State, WebSocketUpgrade},
    http::{header::ORIGIN, HeaderMap},
    response::{IntoResponse, Response},
};
use futures::{Sink, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};

use crate::auth::{extract_token, TokenQuery};
use crate::error::AppError;
use crate::hub::{ConnectionKey, HubHandle, OutboundReceiver, OutboundSender, UserId};
use crate::metrics::WsMetrics;
use crate::notification::{Envelope, UnreadCounter};
use crate::server::{origin_allowed, AppState};

use super::pump::{read_pump, write_pump, PumpConfig, PumpExit};

/// WebSocket upgrade handler
///
/// The origin check, authentication and admission all happen before the
/// upgrade, so a rejected client gets a plain HTTP error instead of a socket.
#[tracing::instrument(
    name = "ws.upgrade",
    skip(ws, state, query, headers),
    fields(has_query_token = query.token.is_some())
)]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if !origin_allowed(&state.settings.server.cors_origins, &headers) {
        let origin = headers
            .get(ORIGIN)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("<non-ascii>")
            .to_string();
        return Err(AppError::OriginNotAllowed(origin));
    }

    let token = extract_token(&query, &headers)
        .ok_or_else(|| AppError::Auth("Missing authentication token".to_string()))?;
    let user_id = state.jwt_validator.resolve_user(&token)?;

    let ws_config = &state.settings.websocket;
    let (tx, rx) = mpsc::channel(ws_config.send_buffer.max(1));
    seed_counts(state.counter.as_ref(), user_id, &tx).await;

    let key = state.hub.register(user_id, tx).await?;

    tracing::info!(
        connection_id = %key.id,
        user_id = %user_id,
        slot = key.slot,
        "WebSocket upgrade accepted"
    );

    let pump_config = PumpConfig::from(ws_config);
    let failed_hub = state.hub.clone();
    let hub = state.hub.clone();

    Ok(ws
        .max_message_size(ws_config.max_message_size)
        .max_frame_size(ws_config.max_message_size)
        .on_failed_upgrade(move |e| {
            tracing::warn!(connection_id = %key.id, error = %e, "WebSocket upgrade failed");
            failed_hub.unregister(key);
        })
        .on_upgrade(move |socket| async move {
            run_connection(socket, key, rx, hub, pump_config).await;
        })
        .into_response())
}

/// Queue the user's current counters as the first frame of a new connection.
/// A counter failure only costs the client its initial sync.
async fn seed_counts(counter: &dyn UnreadCounter, user_id: UserId, tx: &OutboundSender) {
    let counts = match counter.unread_counts(user_id).await {
        Ok(counts) => counts,
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Skipping initial counter sync");
            return;
        }
    };

    match Envelope::sync(counts).to_json() {
        Ok(json) => {
            if tx.try_send(json.into()).is_err() {
                tracing::warn!(user_id = %user_id, "Outbound queue refused initial sync");
            }
        }
        Err(e) => tracing::error!(user_id = %user_id, error = %e, "Failed to encode initial sync"),
    }
}

/// Drive an upgraded connection until either pump stops.
///
/// The connection is unregistered exactly once. When the read side ends
/// first, unregistering closes the outbound queue and the write pump gets a
/// chance to send its close frame before it is torn down.
pub async fn run_connection<S, E>(
    socket: S,
    key: ConnectionKey,
    rx: OutboundReceiver,
    hub: HubHandle,
    config: PumpConfig,
) -> PumpExit
where
    S: Sink<Message> + Stream<Item = Result<Message, E>> + Send + 'static,
    <S as Sink<Message>>::Error: Display + Send + 'static,
    E: Display + Send + 'static,
{
    let started = Instant::now();
    let (sink, stream) = socket.split();

    let mut writer = tokio::spawn(write_pump(sink, rx, config));
    let mut reader = tokio::spawn(read_pump(stream, config.read_timeout));

    let exit = tokio::select! {
        result = &mut writer => {
            hub.unregister(key);
            reader.abort();
            result.unwrap_or(PumpExit::Aborted)
        }
        result = &mut reader => {
            hub.unregister(key);
            if timeout(config.write_timeout, &mut writer).await.is_err() {
                writer.abort();
            }
            result.unwrap_or(PumpExit::Aborted)
        }
    };

    let duration = started.elapsed().as_secs_f64();
    WsMetrics::record_closed(exit.as_str(), duration);

    tracing::info!(
        connection_id = %key.id,
        user_id = %key.user_id,
        slot = key.slot,
        reason = exit.as_str(),
        duration_secs = duration,
        "WebSocket connection closed"
    );

    exit
}
