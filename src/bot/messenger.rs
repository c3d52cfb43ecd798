//! Telegram implementation of the engine's messaging collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode, ReplyParameters};
use tracing::debug;

use super::dispatcher::ThrottledBot;
use crate::database::UserRepository;
use crate::error::{BotError, BotResult};
use crate::modes::{Messenger, UserRef};

pub struct TelegramMessenger {
    bot: ThrottledBot,
    users: Arc<UserRepository>,
}

impl TelegramMessenger {
    pub fn new(bot: ThrottledBot, users: Arc<UserRepository>) -> Self {
        Self { bot, users }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn resolve_user(&self, user: &UserRef) -> BotResult<u64> {
        let handle = match user {
            UserRef::Id(id) => return Ok(*id),
            UserRef::Handle(handle) => handle,
        };

        if let Some(id) = self.users.resolve_username(handle).await? {
            return Ok(id);
        }

        // Only works for handles Telegram exposes publicly.
        let chat = self.bot.get_chat(handle.clone()).await?;
        if chat.is_private() {
            debug!("Resolved {} via get_chat", handle);
            return Ok(chat.id.0 as u64);
        }
        Err(BotError::NotFound(format!("{} is not a user", handle)))
    }

    async fn send(&self, chat_id: i64, text: &str) -> BotResult<()> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }

    async fn send_reply(&self, chat_id: i64, message_id: i32, text: &str) -> BotResult<()> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .reply_parameters(ReplyParameters::new(MessageId(message_id)))
            .await?;
        Ok(())
    }

    async fn delete(&self, chat_id: i64, message_id: i32) -> BotResult<()> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await?;
        Ok(())
    }

    async fn display_name(&self, user_id: u64) -> BotResult<String> {
        if let Some(user) = self.users.get(user_id).await? {
            return Ok(user.first_name);
        }
        let chat = self.bot.get_chat(ChatId(user_id as i64)).await?;
        Ok(chat.first_name().unwrap_or("User").to_string())
    }
}
