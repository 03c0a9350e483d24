//! Pub/sub relay between hub processes.
//!
//! Channel names are decimal user ids. The bridge pattern-subscribes and
//! turns each message into a hub delivery; transports publish envelopes
//! either on Redis or directly into the local hub.

mod backoff;
mod bridge;
mod event;
mod transport;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use bridge::{BridgeOutcome, BusBridge};
pub use event::{channel_for, decode_delivery, BusError, BusEvent};
pub use transport::{BusTransport, LocalTransport, RedisTransport};
