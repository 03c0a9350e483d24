use std::time::Duration;

use futures::StreamExt;
use tokio::sync::broadcast;

use crate::config::RedisConfig;
use crate::hub::{HubError, HubHandle};
use crate::metrics::BusMetrics;

use super::backoff::ExponentialBackoff;
use super::event::{BusError, BusEvent};

/// What happened to one bus event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeOutcome {
    Forwarded,
    Dropped,
    Ignored,
}

/// Relays pub/sub messages into hub deliveries
pub struct BusBridge {
    config: RedisConfig,
    hub: HubHandle,
    delivery_timeout: Duration,
    shutdown: broadcast::Sender<()>,
}

impl BusBridge {
    pub fn new(config: RedisConfig, hub: HubHandle, delivery_timeout: Duration) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            config,
            hub,
            delivery_timeout,
            shutdown,
        }
    }

    /// Get a shutdown signal sender
    pub fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    /// Run until shutdown, reconnecting with backoff whenever the
    /// subscription drops
    pub async fn start(&self) -> anyhow::Result<()> {
        tracing::info!(pattern = %self.config.pattern, "Starting bus bridge");

        let mut shutdown_rx = self.shutdown.subscribe();
        let mut backoff = ExponentialBackoff::new();

        loop {
            match self.run_subscription_loop(&mut shutdown_rx, &mut backoff).await {
                Ok(()) => {
                    tracing::info!("Bus bridge stopped gracefully");
                    break;
                }
                Err(e) => {
                    BusMetrics::record_reconnect();
                    let delay = backoff.next_delay();
                    tracing::error!(
                        error = %e,
                        attempt = backoff.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        "Bus subscription error, reconnecting"
                    );

                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            tracing::info!("Bus bridge stopped while reconnecting");
                            break;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        Ok(())
    }

    async fn run_subscription_loop(
        &self,
        shutdown_rx: &mut broadcast::Receiver<()>,
        backoff: &mut ExponentialBackoff,
    ) -> Result<(), BusError> {
        let client = redis::Client::open(self.config.url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;

        pubsub.psubscribe(&self.config.pattern).await?;
        self.handle_event(BusEvent::Subscribed {
            pattern: self.config.pattern.clone(),
        })
        .await;
        backoff.reset();

        let mut message_stream = pubsub.on_message();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Bus bridge received shutdown signal");
                    return Ok(());
                }
                msg = message_stream.next() => {
                    let Some(msg) = msg else {
                        return Err(BusError::StreamEnded);
                    };

                    let channel = msg.get_channel_name().to_string();
                    let event = match msg.get_payload::<String>() {
                        Ok(payload) => BusEvent::from_message(&channel, &payload),
                        Err(e) => BusEvent::Malformed {
                            channel,
                            reason: BusError::Redis(e),
                        },
                    };

                    self.handle_event(event).await;
                }
            }
        }
    }

    /// Act on one decoded bus event. A bad message never ends the loop.
    pub async fn handle_event(&self, event: BusEvent) -> BridgeOutcome {
        match event {
            BusEvent::Delivery(delivery) => {
                BusMetrics::record_received();
                let user_id = delivery.user_id;

                match self.hub.deliver_timeout(delivery, self.delivery_timeout).await {
                    Ok(()) => {
                        tracing::debug!(user_id = %user_id, "Forwarded bus message to hub");
                        BridgeOutcome::Forwarded
                    }
                    Err(HubError::DeliveryTimeout) => {
                        BusMetrics::record_dropped();
                        tracing::warn!(
                            user_id = %user_id,
                            timeout_ms = self.delivery_timeout.as_millis() as u64,
                            "Hub saturated, dropping bus message"
                        );
                        BridgeOutcome::Dropped
                    }
                    Err(e) => {
                        BusMetrics::record_dropped();
                        tracing::error!(user_id = %user_id, error = %e, "Hub unavailable, dropping bus message");
                        BridgeOutcome::Dropped
                    }
                }
            }
            BusEvent::Subscribed { pattern } => {
                tracing::info!(pattern = %pattern, "Bus subscription established");
                BridgeOutcome::Ignored
            }
            BusEvent::Malformed { channel, reason } => {
                BusMetrics::record_received();
                BusMetrics::record_malformed();
                tracing::warn!(channel = %channel, error = %reason, "Dropping malformed bus message");
                BridgeOutcome::Ignored
            }
        }
    }
}
