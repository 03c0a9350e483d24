use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::{api_key_auth, AppState};

use super::broadcast::broadcast_notification;
use super::health::{health, stats};
use super::metrics::prometheus_metrics;
use super::publish::publish_notification;

pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health & Stats
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        // Notification endpoints
        .nest(
            "/api/v1",
            Router::new()
                .route("/notifications/publish", post(publish_notification))
                .route("/notifications/broadcast", post(broadcast_notification))
                .route_layer(middleware::from_fn_with_state(state, api_key_auth)),
        )
}
