//! Known user model.
//!
//! Every sender seen by the bot is recorded so `@handle` arguments can be
//! resolved and mentions render without a platform lookup.

use serde::{Deserialize, Serialize};
use teloxide::types::User;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KnownUser {
    pub user_id: u64,
    /// Lowercase handle without `@`, for matching.
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub updated_at: i64,
}

impl KnownUser {
    pub fn from_telegram(user: &User) -> Self {
        Self {
            user_id: user.id.0,
            username: user.username.as_ref().map(|u| u.to_lowercase()),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            updated_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Whether the platform profile differs from what is stored.
    pub fn differs_from(&self, user: &User) -> bool {
        self.username != user.username.as_ref().map(|u| u.to_lowercase())
            || self.first_name != user.first_name
            || self.last_name != user.last_name
    }
}
