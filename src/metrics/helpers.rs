//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use crate::hub::HubStats;

use super::{
    BUS_MESSAGES_DROPPED, BUS_MESSAGES_MALFORMED, BUS_MESSAGES_PUBLISHED, BUS_MESSAGES_RECEIVED,
    BUS_RECONNECTIONS_TOTAL, CONNECTIONS_EVICTED_TOTAL, CONNECTIONS_REJECTED_TOTAL,
    CONNECTIONS_TOTAL, PAYLOADS_ENQUEUED_TOTAL, USERS_CONNECTED, WS_CONNECTIONS_CLOSED,
    WS_CONNECTION_DURATION,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording hub metrics
pub struct HubMetrics;

impl HubMetrics {
    /// Mirror the registry size into gauges
    pub fn set_registry(stats: &HubStats) {
        CONNECTIONS_TOTAL.set(stats.total_connections as i64);
        USERS_CONNECTED.set(stats.unique_users as i64);
    }

    pub fn record_enqueued(count: u64) {
        PAYLOADS_ENQUEUED_TOTAL.inc_by(count);
    }

    pub fn record_evicted() {
        CONNECTIONS_EVICTED_TOTAL.inc();
    }

    pub fn record_rejected() {
        CONNECTIONS_REJECTED_TOTAL.inc();
    }
}

/// Helper struct for recording WebSocket connection metrics
pub struct WsMetrics;

impl WsMetrics {
    pub fn record_closed(reason: &str, duration_secs: f64) {
        WS_CONNECTIONS_CLOSED.with_label_values(&[reason]).inc();
        WS_CONNECTION_DURATION.observe(duration_secs);
    }
}

/// Helper struct for recording bus metrics
pub struct BusMetrics;

impl BusMetrics {
    pub fn record_received() {
        BUS_MESSAGES_RECEIVED.inc();
    }

    pub fn record_malformed() {
        BUS_MESSAGES_MALFORMED.inc();
    }

    pub fn record_dropped() {
        BUS_MESSAGES_DROPPED.inc();
    }

    pub fn record_reconnect() {
        BUS_RECONNECTIONS_TOTAL.inc();
    }

    pub fn record_published() {
        BUS_MESSAGES_PUBLISHED.inc();
    }

    /// Current dropped-message count
    pub fn dropped() -> u64 {
        BUS_MESSAGES_DROPPED.get()
    }
}
