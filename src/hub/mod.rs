//! Connection hub: the registry of live WebSocket connections and the
//! serialized event loop that routes deliveries to them.

mod registry;
mod stats;
mod types;
mod worker;

pub use registry::Registry;
pub use stats::HubStats;
pub use types::{
    Connection, ConnectionError, ConnectionId, ConnectionKey, ConnectionLimits, Delivery,
    DeliveryOutcome, HubError, OutboundReceiver, OutboundSender, Payload, Slot, UserId,
    DEFAULT_MAX_CONNECTIONS_PER_USER,
};
pub use worker::{Hub, HubHandle, HubWorker, DEFAULT_DELIVERY_BUFFER_SIZE};
