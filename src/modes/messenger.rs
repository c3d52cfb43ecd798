//! Messaging collaborator contract.
//!
//! The engine never talks to Telegram directly. Everything outbound goes
//! through this trait so loop ticks and dispatcher stages can be exercised
//! against an in-memory double.

use std::fmt;

use async_trait::async_trait;

use crate::error::BotResult;

/// Operator-supplied reference to a user: a numeric id or a platform handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Id(u64),
    Handle(String),
}

impl UserRef {
    /// Parse a command argument. Digits are ids, anything else is a handle.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<u64>() {
            Ok(id) => Some(Self::Id(id)),
            Err(_) => {
                let handle = if raw.starts_with('@') {
                    raw.to_string()
                } else {
                    format!("@{}", raw)
                };
                Some(Self::Handle(handle))
            }
        }
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Handle(handle) => f.write_str(handle),
        }
    }
}

/// Outbound operations the engine needs from the chat platform.
///
/// Text arguments are already formatted as HTML.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Resolve a reference to a numeric user id. `NotFound` if unresolvable.
    async fn resolve_user(&self, user: &UserRef) -> BotResult<u64>;

    async fn send(&self, chat_id: i64, text: &str) -> BotResult<()>;

    async fn send_reply(&self, chat_id: i64, message_id: i32, text: &str) -> BotResult<()>;

    async fn delete(&self, chat_id: i64, message_id: i32) -> BotResult<()>;

    /// Platform display name, used when no nickname override exists.
    async fn display_name(&self, user_id: u64) -> BotResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_ref() {
        assert_eq!(UserRef::parse("42"), Some(UserRef::Id(42)));
        assert_eq!(UserRef::parse("@alice"), Some(UserRef::Handle("@alice".into())));
        assert_eq!(UserRef::parse("bob"), Some(UserRef::Handle("@bob".into())));
        assert_eq!(UserRef::parse("  "), None);
    }
}
