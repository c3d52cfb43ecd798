//! Display-name resolution and mention formatting.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::Messenger;
use crate::utils::html_escape;

/// Nickname overrides, keyed by user id.
#[async_trait]
pub trait NicknameStore: Send + Sync {
    async fn nickname(&self, user_id: u64) -> anyhow::Result<Option<String>>;
}

/// Resolves the name shown in mentions: nickname first, then the platform.
#[derive(Clone)]
pub struct NameResolver {
    nicknames: Arc<dyn NicknameStore>,
    messenger: Arc<dyn Messenger>,
}

impl NameResolver {
    pub fn new(nicknames: Arc<dyn NicknameStore>, messenger: Arc<dyn Messenger>) -> Self {
        Self { nicknames, messenger }
    }

    /// Nickname override only.
    pub async fn nickname(&self, user_id: u64) -> Option<String> {
        match self.nicknames.nickname(user_id).await {
            Ok(nick) => nick,
            Err(e) => {
                debug!("Nickname lookup failed for {}: {}", user_id, e);
                None
            }
        }
    }

    /// Nickname, else the platform display name, else a generic label.
    pub async fn display_name(&self, user_id: u64) -> String {
        if let Some(nick) = self.nickname(user_id).await {
            return nick;
        }
        match self.messenger.display_name(user_id).await {
            Ok(name) => name,
            Err(e) => {
                debug!("Display name lookup failed for {}: {}", user_id, e);
                format!("User {}", user_id)
            }
        }
    }

    /// Name for a sender whose platform name is already known.
    pub async fn sender_name(&self, user_id: u64, first_name: &str) -> String {
        match self.nickname(user_id).await {
            Some(nick) => nick,
            None => first_name.to_string(),
        }
    }

    /// HTML mention resolved through `display_name`.
    pub async fn mention(&self, user_id: u64) -> String {
        mention(user_id, &self.display_name(user_id).await)
    }
}

/// HTML text-mention link for a user.
pub fn mention(user_id: u64, name: &str) -> String {
    format!("<a href=\"tg://user?id={}\">{}</a>", user_id, html_escape(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::testing::{MemoryNicknames, RecordingMessenger};

    #[test]
    fn test_mention_escapes_name() {
        assert_eq!(
            mention(7, "<b>x</b>"),
            "<a href=\"tg://user?id=7\">&lt;b&gt;x&lt;/b&gt;</a>"
        );
    }

    #[tokio::test]
    async fn test_nickname_overrides_platform_name() {
        let nicknames = Arc::new(MemoryNicknames::default());
        let messenger = Arc::new(RecordingMessenger::new());
        messenger.set_name(5, "Platform");
        let names = NameResolver::new(nicknames.clone(), messenger);

        assert_eq!(names.display_name(5).await, "Platform");
        nicknames.set(5, "Nick");
        assert_eq!(names.display_name(5).await, "Nick");
        assert_eq!(names.display_name(6).await, "User 6");
    }
}
