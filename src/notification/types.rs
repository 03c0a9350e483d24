use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A notification addressed to one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyUserMessage {
    pub message_id: String,
    pub message: String,
    pub category: String,
    pub notify_type: i32,
    pub sender_uid: i64,
    pub sender_name: String,
    pub uid: i64,
    pub read: bool,
    pub ts_message_publish: Option<DateTime<Utc>>,
    pub ts_read: Option<DateTime<Utc>>,
}

impl NotifyUserMessage {
    /// A real notification carries an id; an empty message only syncs counters
    pub fn is_new(&self) -> bool {
        !self.message_id.is_empty()
    }
}

/// Absolute unread counters for a user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnreadCounts {
    pub unread_notice_count: i64,
    pub unread_message_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unhandled_request_count: Option<i64>,
}

/// Counter adjustments for a notification that the store has not seen yet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnreadDeltas {
    pub notice: i64,
    pub message: i64,
    pub unhandled_request: i64,
}

impl UnreadCounts {
    /// Counters after `deltas`, clamped at the i64 bounds
    pub fn apply(self, deltas: UnreadDeltas) -> Self {
        Self {
            unread_notice_count: self.unread_notice_count.saturating_add(deltas.notice),
            unread_message_count: self.unread_message_count.saturating_add(deltas.message),
            unhandled_request_count: Some(
                self.unhandled_request_count
                    .unwrap_or(0)
                    .saturating_add(deltas.unhandled_request),
            ),
        }
    }
}

/// Frame pushed to clients and carried on the bus
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub message: NotifyUserMessage,
    #[serde(default)]
    pub new_message: bool,
    #[serde(flatten)]
    pub counts: UnreadCounts,
}

impl Envelope {
    pub fn new(message: NotifyUserMessage, counts: UnreadCounts) -> Self {
        Self {
            new_message: message.is_new(),
            message,
            counts,
        }
    }

    /// Counter-only envelope sent to a freshly opened connection
    pub fn sync(counts: UnreadCounts) -> Self {
        Self::new(NotifyUserMessage::default(), counts)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
