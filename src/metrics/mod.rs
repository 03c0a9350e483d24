//! Prometheus metrics for the notification hub.
//!
//! - Registry metrics (live connections, connected users)
//! - Delivery metrics (enqueued payloads, evicted slow connections)
//! - Admission metrics (rejected upgrades)
//! - Bus metrics (received, malformed and dropped pub/sub messages)

mod helpers;

pub use helpers::{encode_metrics, BusMetrics, HubMetrics, WsMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "notification_hub";

lazy_static! {
    // ============================================================================
    // Registry Metrics
    // ============================================================================

    /// Total number of registered WebSocket connections
    pub static ref CONNECTIONS_TOTAL: IntGauge = register_int_gauge!(
        format!("{}_connections_total", METRIC_PREFIX),
        "Total number of registered WebSocket connections"
    ).unwrap();

    /// Number of users with at least one connection
    pub static ref USERS_CONNECTED: IntGauge = register_int_gauge!(
        format!("{}_users_connected", METRIC_PREFIX),
        "Number of users with at least one live connection"
    ).unwrap();

    /// Upgrades refused at admission
    pub static ref CONNECTIONS_REJECTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_connections_rejected_total", METRIC_PREFIX),
        "Total connection attempts rejected by the per-user cap"
    ).unwrap();

    // ============================================================================
    // Delivery Metrics
    // ============================================================================

    /// Payloads placed on connection queues
    pub static ref PAYLOADS_ENQUEUED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_payloads_enqueued_total", METRIC_PREFIX),
        "Total payloads enqueued on connection outbound queues"
    ).unwrap();

    /// Connections evicted because their queue was full or closed
    pub static ref CONNECTIONS_EVICTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_connections_evicted_total", METRIC_PREFIX),
        "Total connections evicted during delivery"
    ).unwrap();

    // ============================================================================
    // WebSocket Metrics
    // ============================================================================

    /// Connection lifetime
    pub static ref WS_CONNECTION_DURATION: Histogram = register_histogram!(
        format!("{}_ws_connection_duration_seconds", METRIC_PREFIX),
        "WebSocket connection duration in seconds",
        vec![1.0, 10.0, 60.0, 300.0, 900.0, 3600.0, 14400.0]
    ).unwrap();

    /// Connection terminations by reason
    pub static ref WS_CONNECTIONS_CLOSED: IntCounterVec = register_int_counter_vec!(
        format!("{}_ws_connections_closed_total", METRIC_PREFIX),
        "Total WebSocket connections closed",
        &["reason"]
    ).unwrap();

    // ============================================================================
    // Bus Metrics
    // ============================================================================

    /// Messages received from the pub/sub bus
    pub static ref BUS_MESSAGES_RECEIVED: IntCounter = register_int_counter!(
        format!("{}_bus_messages_received_total", METRIC_PREFIX),
        "Total messages received from the pub/sub bus"
    ).unwrap();

    /// Bus messages dropped because of a bad channel name or payload
    pub static ref BUS_MESSAGES_MALFORMED: IntCounter = register_int_counter!(
        format!("{}_bus_messages_malformed_total", METRIC_PREFIX),
        "Total bus messages dropped as malformed"
    ).unwrap();

    /// Bus messages dropped because the hub did not accept them in time
    pub static ref BUS_MESSAGES_DROPPED: IntCounter = register_int_counter!(
        format!("{}_bus_messages_dropped_total", METRIC_PREFIX),
        "Total bus messages dropped because the hub was saturated"
    ).unwrap();

    /// Bus reconnection attempts
    pub static ref BUS_RECONNECTIONS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_bus_reconnections_total", METRIC_PREFIX),
        "Total pub/sub reconnection attempts"
    ).unwrap();

    /// Envelopes published by this process
    pub static ref BUS_MESSAGES_PUBLISHED: IntCounter = register_int_counter!(
        format!("{}_bus_messages_published_total", METRIC_PREFIX),
        "Total notification envelopes published"
    ).unwrap();
}
