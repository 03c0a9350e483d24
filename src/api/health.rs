//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::hub::HubStats;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub hub_running: bool,
    pub bus: BusHealthResponse,
    pub connections: HubStats,
}

#[derive(Debug, Serialize)]
pub struct BusHealthResponse {
    pub transport: String,
    pub pattern: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub connections: HubStats,
    pub max_connections_per_user: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.hub.stats().await;
    let hub_running = stats.is_ok();
    let status = if hub_running { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        hub_running,
        bus: BusHealthResponse {
            transport: state.publisher.transport_name().to_string(),
            pattern: state.settings.redis.pattern.clone(),
        },
        connections: stats.unwrap_or_default(),
    })
}

pub async fn stats(State(state): State<AppState>) -> crate::error::Result<Json<StatsResponse>> {
    let connections = state.hub.stats().await?;

    Ok(Json(StatsResponse {
        connections,
        max_connections_per_user: state.settings.hub.max_connections_per_user,
    }))
}
