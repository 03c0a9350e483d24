//! Hub statistics structures

use serde::Serialize;

/// Snapshot of the hub's registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub total_connections: usize,
    pub unique_users: usize,
}
