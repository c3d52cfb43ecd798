//! Tracked chat document.

use serde::{Deserialize, Serialize};
use teloxide::types::Chat;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRecord {
    pub chat_id: i64,
    /// `private`, `group`, `supergroup` or `channel`.
    pub chat_type: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    /// Only fetched for groups.
    #[serde(default)]
    pub member_count: Option<u32>,
    pub first_seen: i64,
    pub last_seen: i64,
    /// Cleared when the bot can no longer post there.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl ChatRecord {
    pub fn from_telegram(chat: &Chat, member_count: Option<u32>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            chat_id: chat.id.0,
            chat_type: chat_type_name(chat).to_string(),
            title: chat.title().map(str::to_string),
            username: chat.username().map(str::to_string),
            member_count,
            first_seen: now,
            last_seen: now,
            active: true,
        }
    }

    pub fn is_group(&self) -> bool {
        self.chat_type == "group" || self.chat_type == "supergroup"
    }
}

fn chat_type_name(chat: &Chat) -> &'static str {
    if chat.is_private() {
        "private"
    } else if chat.is_supergroup() {
        "supergroup"
    } else if chat.is_group() {
        "group"
    } else {
        "channel"
    }
}
