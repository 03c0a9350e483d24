use std::collections::{BTreeMap, HashMap};

use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::metrics::HubMetrics;

use super::stats::HubStats;
use super::types::{
    Connection, ConnectionError, ConnectionId, ConnectionKey, ConnectionLimits, Delivery,
    DeliveryOutcome, OutboundSender, Payload, Slot, UserId,
};

/// Two views over the set of live connections.
///
/// `connections` answers membership, `users` answers targeted delivery and
/// slot allocation. An id is present in `connections` exactly when its
/// connection is present in `users` under its own user id and slot. Only the
/// hub worker owns a `Registry`, so no locking is involved.
#[derive(Debug)]
pub struct Registry {
    limits: ConnectionLimits,
    /// connection_id -> (user_id, slot)
    connections: HashMap<ConnectionId, (UserId, Slot)>,
    /// user_id -> slot -> connection
    users: HashMap<UserId, BTreeMap<Slot, Connection>>,
}

impl Registry {
    pub fn new(limits: ConnectionLimits) -> Self {
        Self {
            limits,
            connections: HashMap::new(),
            users: HashMap::new(),
        }
    }

    /// Admit a connection and assign it the next slot for its user.
    ///
    /// The cap is checked before a slot is taken; a rejected attempt leaves
    /// the registry untouched. Slots are `max(existing) + 1`.
    pub fn register(
        &mut self,
        user_id: UserId,
        sender: OutboundSender,
    ) -> Result<ConnectionKey, ConnectionError> {
        let current = self.connection_count(user_id);
        if current >= self.limits.max_connections_per_user {
            return Err(ConnectionError::UserLimitExceeded {
                user_id,
                current,
                max: self.limits.max_connections_per_user,
            });
        }

        let slots = self.users.entry(user_id).or_default();
        let slot = slots.last_key_value().map(|(s, _)| s + 1).unwrap_or(1);
        let key = ConnectionKey {
            id: Uuid::new_v4(),
            user_id,
            slot,
        };

        slots.insert(slot, Connection::new(key, sender));
        self.connections.insert(key.id, (user_id, slot));

        tracing::info!(
            connection_id = %key.id,
            user_id = %user_id,
            slot = slot,
            "Connection registered"
        );

        Ok(key)
    }

    /// Remove a connection from both views.
    ///
    /// Returns false when the connection is not registered, which makes a
    /// repeated call a no-op. The removed record owns the queue's only
    /// sender, so the queue is closed here and nowhere else.
    pub fn unregister(&mut self, key: &ConnectionKey) -> bool {
        if self.connections.remove(&key.id).is_none() {
            return false;
        }

        if let Some(slots) = self.users.get_mut(&key.user_id) {
            slots.remove(&key.slot);
            if slots.is_empty() {
                self.users.remove(&key.user_id);
            }
        }

        tracing::info!(
            connection_id = %key.id,
            user_id = %key.user_id,
            slot = key.slot,
            "Connection unregistered"
        );

        true
    }

    /// Enqueue a payload on every live connection of the target user.
    ///
    /// Sends never block. A connection whose queue is full, or whose write
    /// pump is gone, is evicted.
    pub fn deliver(&mut self, delivery: &Delivery) -> DeliveryOutcome {
        let Some(slots) = self.users.get(&delivery.user_id) else {
            tracing::debug!(user_id = %delivery.user_id, "No live connections for user");
            return DeliveryOutcome::default();
        };

        let (enqueued, stale) = fan_out(slots.values(), &delivery.payload);
        let evicted = self.evict(stale);

        tracing::debug!(
            user_id = %delivery.user_id,
            enqueued = enqueued,
            evicted = evicted,
            "Delivered payload"
        );

        DeliveryOutcome { enqueued, evicted }
    }

    /// Enqueue a payload on every registered connection.
    pub fn broadcast(&mut self, payload: &Payload) -> DeliveryOutcome {
        let (enqueued, stale) = fan_out(self.users.values().flat_map(|s| s.values()), payload);
        let evicted = self.evict(stale);

        DeliveryOutcome { enqueued, evicted }
    }

    pub fn connection_count(&self, user_id: UserId) -> usize {
        self.users.get(&user_id).map(|s| s.len()).unwrap_or(0)
    }

    /// Slots currently assigned to a user, ascending
    pub fn slots(&self, user_id: UserId) -> Vec<Slot> {
        self.users
            .get(&user_id)
            .map(|s| s.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, key: &ConnectionKey) -> bool {
        self.connections.get(&key.id) == Some(&(key.user_id, key.slot))
    }

    pub fn has_user(&self, user_id: UserId) -> bool {
        self.users.contains_key(&user_id)
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            total_connections: self.connections.len(),
            unique_users: self.users.len(),
        }
    }

    fn evict(&mut self, stale: Vec<ConnectionKey>) -> usize {
        let mut evicted = 0;
        for key in stale {
            if self.unregister(&key) {
                HubMetrics::record_evicted();
                evicted += 1;
            }
        }
        evicted
    }
}

fn fan_out<'a>(
    connections: impl Iterator<Item = &'a Connection>,
    payload: &Payload,
) -> (usize, Vec<ConnectionKey>) {
    let mut enqueued = 0;
    let mut stale = Vec::new();

    for conn in connections {
        match conn.sender.try_send(payload.clone()) {
            Ok(()) => enqueued += 1,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    connection_id = %conn.key.id,
                    user_id = %conn.key.user_id,
                    slot = conn.key.slot,
                    "Outbound queue full, evicting slow connection"
                );
                stale.push(conn.key);
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(
                    connection_id = %conn.key.id,
                    user_id = %conn.key.user_id,
                    "Outbound queue closed, evicting connection"
                );
                stale.push(conn.key);
            }
        }
    }

    HubMetrics::record_enqueued(enqueued as u64);
    (enqueued, stale)
}
