//! API layer - HTTP endpoint handlers.

mod broadcast;
mod health;
mod metrics;
mod publish;
mod routes;

pub use broadcast::{broadcast_notification, BroadcastResponse};
pub use health::{health, stats, BusHealthResponse, HealthResponse, StatsResponse};
pub use metrics::prometheus_metrics;
pub use publish::{publish_notification, PublishRequest};
pub use routes::api_routes;
