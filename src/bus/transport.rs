//! Publish side of the bus.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::hub::HubHandle;

use super::event::{decode_delivery, BusError};

/// Something an envelope can be published on
#[async_trait]
pub trait BusTransport: Send + Sync {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), BusError>;

    fn name(&self) -> &'static str;
}

/// Publishes on Redis so every hub process subscribed to the pattern sees it
#[derive(Clone)]
pub struct RedisTransport {
    conn: ConnectionManager,
}

impl RedisTransport {
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("Redis publish connection established");
        Ok(Self { conn })
    }
}

#[async_trait]
impl BusTransport for RedisTransport {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), BusError> {
        let mut conn = self.conn.clone();
        let receivers: i64 = conn.publish(channel, payload).await?;
        tracing::debug!(channel = %channel, receivers = receivers, "Published envelope");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Single-process bus: decodes like the bridge and hands the delivery
/// straight to the local hub
#[derive(Clone)]
pub struct LocalTransport {
    hub: HubHandle,
}

impl LocalTransport {
    pub fn new(hub: HubHandle) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl BusTransport for LocalTransport {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), BusError> {
        let delivery = decode_delivery(channel, &payload)?;
        self.hub.deliver(delivery).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
