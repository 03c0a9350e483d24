//! Notification envelopes, unread counters and the publish path.

mod counter;
mod publisher;
mod types;

pub use counter::{CounterError, UnreadCounter, ZeroUnreadCounter};
pub use publisher::{NotificationPublisher, PublishError};
pub use types::{Envelope, NotifyUserMessage, UnreadCounts, UnreadDeltas};
