//! Builds envelopes for a user and publishes them on the bus.

use std::sync::Arc;

use thiserror::Error;

use crate::bus::{channel_for, BusError, BusTransport};
use crate::hub::UserId;
use crate::metrics::BusMetrics;

use super::counter::{CounterError, UnreadCounter};
use super::types::{Envelope, NotifyUserMessage, UnreadCounts, UnreadDeltas};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to load unread counters: {0}")]
    Counter(#[from] CounterError),

    #[error("Failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to publish envelope: {0}")]
    Bus(#[from] BusError),
}

/// Publishing side of the notification flow
#[derive(Clone)]
pub struct NotificationPublisher {
    transport: Arc<dyn BusTransport>,
    counter: Arc<dyn UnreadCounter>,
}

impl NotificationPublisher {
    pub fn new(transport: Arc<dyn BusTransport>, counter: Arc<dyn UnreadCounter>) -> Self {
        Self { transport, counter }
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Publish `message` to every connection `user_id` holds on any hub
    /// process. `deltas` are added to the stored counters for changes the
    /// store has not recorded yet. Returns the counts that were sent.
    pub async fn publish(
        &self,
        user_id: UserId,
        message: NotifyUserMessage,
        deltas: UnreadDeltas,
    ) -> Result<UnreadCounts, PublishError> {
        let counts = self.counter.unread_counts(user_id).await?.apply(deltas);
        let envelope = Envelope::new(message, counts);
        let payload = envelope.to_json()?;

        self.transport.publish(&channel_for(user_id), payload).await?;
        BusMetrics::record_published();

        tracing::debug!(
            user_id = %user_id,
            message_id = %envelope.message.message_id,
            transport = self.transport.name(),
            "Published notification"
        );

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::LocalTransport;
    use crate::hub::{ConnectionLimits, Hub};
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    struct FixedCounter(UnreadCounts);

    #[async_trait]
    impl UnreadCounter for FixedCounter {
        async fn unread_counts(&self, _user_id: UserId) -> Result<UnreadCounts, CounterError> {
            Ok(self.0)
        }
    }

    struct BrokenCounter;

    #[async_trait]
    impl UnreadCounter for BrokenCounter {
        async fn unread_counts(&self, _user_id: UserId) -> Result<UnreadCounts, CounterError> {
            Err(CounterError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_publish_applies_deltas_and_delivers() {
        let (hub, worker) = Hub::new(ConnectionLimits::default(), 8);
        tokio::spawn(worker.run());
        let (tx, mut rx) = mpsc::channel(4);
        hub.register(UserId(5), tx).await.unwrap();

        let publisher = NotificationPublisher::new(
            Arc::new(LocalTransport::new(hub)),
            Arc::new(FixedCounter(UnreadCounts {
                unread_notice_count: 3,
                unread_message_count: 1,
                unhandled_request_count: None,
            })),
        );

        let message = NotifyUserMessage {
            message_id: "n-9".to_string(),
            message: "hello".to_string(),
            uid: 5,
            ..Default::default()
        };
        let counts = publisher
            .publish(
                UserId(5),
                message,
                UnreadDeltas {
                    notice: 1,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(counts.unread_notice_count, 4);
        assert_eq!(counts.unhandled_request_count, Some(0));

        let frame = rx.recv().await.unwrap();
        let envelope: Envelope = serde_json::from_str(&frame).unwrap();
        assert!(envelope.new_message);
        assert_eq!(envelope.message.message_id, "n-9");
        assert_eq!(envelope.counts, counts);
    }

    #[tokio::test]
    async fn test_counter_failure_is_reported() {
        let (hub, _worker) = Hub::new(ConnectionLimits::default(), 8);
        let publisher =
            NotificationPublisher::new(Arc::new(LocalTransport::new(hub)), Arc::new(BrokenCounter));

        let err = publisher
            .publish(UserId(1), NotifyUserMessage::default(), UnreadDeltas::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Counter(_)));
    }
}
