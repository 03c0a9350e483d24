use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::AppError;
use crate::hub::UserId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (decimal user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Additional custom claims
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Claims {
    /// Resolve the subject into a hub user id. Only positive ids are users.
    pub fn user_id(&self) -> Result<UserId, AppError> {
        match self.sub.parse::<UserId>() {
            Ok(id) if id.0 > 0 => Ok(id),
            _ => Err(AppError::Auth(format!(
                "Subject is not a user id: {}",
                self.sub
            ))),
        }
    }
}
