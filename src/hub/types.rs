//! Connection identity, handles and limits

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Default cap on simultaneous connections held by one user
pub const DEFAULT_MAX_CONNECTIONS_PER_USER: usize = 10;

/// Opaque serialized envelope shared by every connection it is delivered to
pub type Payload = Arc<str>;

/// Sending half of a connection's outbound queue (owned by the hub)
pub type OutboundSender = mpsc::Sender<Payload>;

/// Receiving half of a connection's outbound queue (owned by the write pump)
pub type OutboundReceiver = mpsc::Receiver<Payload>;

/// User identifier, rendered as a decimal string on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(UserId)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId(id)
    }
}

/// Per-user connection sequence number, starting at 1
pub type Slot = u32;

/// Process-unique connection id
pub type ConnectionId = Uuid;

/// Identity of one registered connection, held by its pumps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    pub id: ConnectionId,
    pub user_id: UserId,
    pub slot: Slot,
}

/// Hub-side record of a live connection
///
/// The hub holds the only `sender` for the connection's outbound queue, so
/// dropping this record is what closes the queue.
#[derive(Debug)]
pub struct Connection {
    pub key: ConnectionKey,
    pub sender: OutboundSender,
    pub connected_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(key: ConnectionKey, sender: OutboundSender) -> Self {
        Self {
            key,
            sender,
            connected_at: Utc::now(),
        }
    }
}

/// A payload addressed to every live connection of one user
#[derive(Debug, Clone)]
pub struct Delivery {
    pub user_id: UserId,
    pub payload: Payload,
}

impl Delivery {
    pub fn new(user_id: UserId, payload: impl Into<Payload>) -> Self {
        Self {
            user_id,
            payload: payload.into(),
        }
    }
}

/// Outcome of fanning one payload out to a set of connections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub enqueued: usize,
    pub evicted: usize,
}

/// Error returned when a connection is refused at admission
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("User {user_id} connection limit exceeded ({current}/{max})")]
    UserLimitExceeded {
        user_id: UserId,
        current: usize,
        max: usize,
    },

    #[error("Hub is not running")]
    HubUnavailable,
}

/// Error returned by hub handle operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HubError {
    #[error("Hub is not running")]
    Closed,

    #[error("Timed out waiting for hub delivery capacity")]
    DeliveryTimeout,
}

/// Limits for connection admission
#[derive(Debug, Clone, Copy)]
pub struct ConnectionLimits {
    pub max_connections_per_user: usize,
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self {
            max_connections_per_user: DEFAULT_MAX_CONNECTIONS_PER_USER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_round_trips_through_channel_name() {
        let id: UserId = "42".parse().unwrap();
        assert_eq!(id, UserId(42));
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_user_id_rejects_non_numeric() {
        assert!("user-7".parse::<UserId>().is_err());
        assert!("".parse::<UserId>().is_err());
        assert!(" 7".parse::<UserId>().is_err());
    }

    #[test]
    fn test_limit_error_message() {
        let err = ConnectionError::UserLimitExceeded {
            user_id: UserId(7),
            current: 10,
            max: 10,
        };
        assert_eq!(err.to_string(), "User 7 connection limit exceeded (10/10)");
    }
}
