use std::time::Duration;

use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, oneshot};

use crate::metrics::HubMetrics;

use super::registry::Registry;
use super::stats::HubStats;
use super::types::{
    ConnectionError, ConnectionKey, ConnectionLimits, Delivery, HubError, OutboundSender, Payload,
    UserId,
};

/// Capacity of the register/query command channel
const CONTROL_BUFFER_SIZE: usize = 256;

/// Default capacity of the delivery event channel
pub const DEFAULT_DELIVERY_BUFFER_SIZE: usize = 1024;

enum Control {
    Register {
        user_id: UserId,
        sender: OutboundSender,
        reply: oneshot::Sender<Result<ConnectionKey, ConnectionError>>,
    },
    ConnectionCount {
        user_id: UserId,
        reply: oneshot::Sender<usize>,
    },
    Stats {
        reply: oneshot::Sender<HubStats>,
    },
}

enum Dispatch {
    Deliver(Delivery),
    Broadcast(Payload),
}

/// Entry point for building a hub
pub struct Hub;

impl Hub {
    /// Create a hub handle and the worker that owns the registry.
    ///
    /// The worker must be spawned for the handle to make progress; it stops
    /// once every handle has been dropped.
    pub fn new(limits: ConnectionLimits, delivery_buffer: usize) -> (HubHandle, HubWorker) {
        let (control_tx, control_rx) = mpsc::channel(CONTROL_BUFFER_SIZE);
        let (unregister_tx, unregister_rx) = mpsc::unbounded_channel();
        let (dispatch_tx, dispatch_rx) = mpsc::channel(delivery_buffer.max(1));

        let handle = HubHandle {
            control_tx,
            unregister_tx,
            dispatch_tx,
        };
        let worker = HubWorker {
            registry: Registry::new(limits),
            limits,
            control_rx,
            unregister_rx,
            dispatch_rx,
        };

        (handle, worker)
    }
}

/// Cloneable handle used by every component that talks to the hub
#[derive(Clone)]
pub struct HubHandle {
    control_tx: mpsc::Sender<Control>,
    unregister_tx: mpsc::UnboundedSender<ConnectionKey>,
    dispatch_tx: mpsc::Sender<Dispatch>,
}

impl HubHandle {
    /// Admit a connection: the per-user cap check and slot assignment happen
    /// in the same hub event.
    pub async fn register(
        &self,
        user_id: UserId,
        sender: OutboundSender,
    ) -> Result<ConnectionKey, ConnectionError> {
        let (reply, rx) = oneshot::channel();
        self.control_tx
            .send(Control::Register {
                user_id,
                sender,
                reply,
            })
            .await
            .map_err(|_| ConnectionError::HubUnavailable)?;

        rx.await.map_err(|_| ConnectionError::HubUnavailable)?
    }

    /// Remove a connection. Never blocks; repeated calls are harmless.
    pub fn unregister(&self, key: ConnectionKey) {
        if self.unregister_tx.send(key).is_err() {
            tracing::debug!(connection_id = %key.id, "Hub stopped before unregister");
        }
    }

    /// Submit a delivery, waiting for buffer capacity
    pub async fn deliver(&self, delivery: Delivery) -> Result<(), HubError> {
        self.dispatch_tx
            .send(Dispatch::Deliver(delivery))
            .await
            .map_err(|_| HubError::Closed)
    }

    /// Submit a delivery, giving up when no capacity frees up within `timeout`
    pub async fn deliver_timeout(
        &self,
        delivery: Delivery,
        timeout: Duration,
    ) -> Result<(), HubError> {
        self.dispatch_tx
            .send_timeout(Dispatch::Deliver(delivery), timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => HubError::DeliveryTimeout,
                SendTimeoutError::Closed(_) => HubError::Closed,
            })
    }

    /// Send a payload to every registered connection
    pub async fn broadcast(&self, payload: impl Into<Payload>) -> Result<(), HubError> {
        self.dispatch_tx
            .send(Dispatch::Broadcast(payload.into()))
            .await
            .map_err(|_| HubError::Closed)
    }

    pub async fn connection_count(&self, user_id: UserId) -> Result<usize, HubError> {
        let (reply, rx) = oneshot::channel();
        self.control_tx
            .send(Control::ConnectionCount { user_id, reply })
            .await
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }

    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (reply, rx) = oneshot::channel();
        self.control_tx
            .send(Control::Stats { reply })
            .await
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }
}

/// Single task that owns and mutates the registry
pub struct HubWorker {
    registry: Registry,
    limits: ConnectionLimits,
    control_rx: mpsc::Receiver<Control>,
    unregister_rx: mpsc::UnboundedReceiver<ConnectionKey>,
    dispatch_rx: mpsc::Receiver<Dispatch>,
}

impl HubWorker {
    /// Process hub events one at a time until every handle is gone
    pub async fn run(mut self) {
        tracing::info!(
            max_connections_per_user = self.limits.max_connections_per_user,
            "Hub started"
        );

        loop {
            // Removals first so a freed slot is visible to the next register
            tokio::select! {
                biased;
                Some(key) = self.unregister_rx.recv() => {
                    self.registry.unregister(&key);
                }
                Some(control) = self.control_rx.recv() => {
                    self.handle_control(control);
                }
                Some(dispatch) = self.dispatch_rx.recv() => {
                    self.handle_dispatch(dispatch);
                }
                else => break,
            }

            HubMetrics::set_registry(&self.registry.stats());
        }

        tracing::info!("Hub stopped");
    }

    fn handle_control(&mut self, control: Control) {
        match control {
            Control::Register {
                user_id,
                sender,
                reply,
            } => {
                let result = self.registry.register(user_id, sender);
                if let Err(ref e) = result {
                    HubMetrics::record_rejected();
                    tracing::warn!(user_id = %user_id, error = %e, "Connection rejected");
                }

                // Caller gave up waiting; do not leak the slot
                if let Err(Ok(key)) = reply.send(result) {
                    self.registry.unregister(&key);
                }
            }
            Control::ConnectionCount { user_id, reply } => {
                let _ = reply.send(self.registry.connection_count(user_id));
            }
            Control::Stats { reply } => {
                let _ = reply.send(self.registry.stats());
            }
        }
    }

    fn handle_dispatch(&mut self, dispatch: Dispatch) {
        match dispatch {
            Dispatch::Deliver(delivery) => {
                self.registry.deliver(&delivery);
            }
            Dispatch::Broadcast(payload) => {
                let outcome = self.registry.broadcast(&payload);
                tracing::debug!(
                    enqueued = outcome.enqueued,
                    evicted = outcome.evicted,
                    "Broadcast payload"
                );
            }
        }
    }
}
