//! Seam to the data store that owns unread counters.

use async_trait::async_trait;
use thiserror::Error;

use crate::hub::UserId;

use super::UnreadCounts;

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("Unread counter store unavailable: {0}")]
    Unavailable(String),
}

/// Source of a user's current unread counters
#[async_trait]
pub trait UnreadCounter: Send + Sync {
    async fn unread_counts(&self, user_id: UserId) -> Result<UnreadCounts, CounterError>;
}

/// Counter used when no store is wired in: every user has nothing unread
#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroUnreadCounter;

#[async_trait]
impl UnreadCounter for ZeroUnreadCounter {
    async fn unread_counts(&self, _user_id: UserId) -> Result<UnreadCounts, CounterError> {
        Ok(UnreadCounts {
            unhandled_request_count: Some(0),
            ..Default::default()
        })
    }
}
