use thiserror::Error;

use crate::hub::{Delivery, HubError, UserId};
use crate::notification::Envelope;

/// Errors raised at the bus boundary
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Channel name is not a user id: {channel}")]
    InvalidChannel {
        channel: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("Payload is not a notification envelope: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Hub rejected delivery: {0}")]
    Hub(#[from] HubError),

    #[error("Bus message stream ended")]
    StreamEnded,
}

/// Everything the bridge can observe on the bus, decoded once at the boundary
#[derive(Debug)]
pub enum BusEvent {
    /// A payload addressed to the user named by the channel
    Delivery(Delivery),
    /// Pattern subscription acknowledged by the server
    Subscribed { pattern: String },
    /// A message that could not be turned into a delivery
    Malformed { channel: String, reason: BusError },
}

impl BusEvent {
    /// Decode a raw pub/sub message
    pub fn from_message(channel: &str, payload: &str) -> Self {
        match decode_delivery(channel, payload) {
            Ok(delivery) => BusEvent::Delivery(delivery),
            Err(reason) => BusEvent::Malformed {
                channel: channel.to_string(),
                reason,
            },
        }
    }
}

/// Parse the channel back into a user id and check the payload is an
/// envelope. The payload itself is forwarded untouched.
pub fn decode_delivery(channel: &str, payload: &str) -> Result<Delivery, BusError> {
    let user_id: UserId = channel.parse().map_err(|source| BusError::InvalidChannel {
        channel: channel.to_string(),
        source,
    })?;

    serde_json::from_str::<Envelope>(payload)?;

    Ok(Delivery::new(user_id, payload))
}

/// Bus channel a user's envelopes are published on
pub fn channel_for(user_id: UserId) -> String {
    user_id.to_string()
}
