//! Event handlers for non-command messages.
//!
//! - `welcome` - greets members from join messages
//! - the reactive pass - every group message goes through the mode engine
//!   (hide, monitor, troll, pair)

pub mod welcome;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tokio::spawn;
use tracing::{debug, warn};

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::ChatRecord;
use crate::modes::{Inbound, Outcome};

/// Build the message event handler. Join messages go to `welcome`; every
/// other group message goes through the reactive pass.
pub fn message_event_handler() -> UpdateHandler<anyhow::Error> {
    dptree::entry().branch(welcome::handler()).branch(
        dptree::filter(|msg: Message| msg.chat.is_group() || msg.chat.is_supergroup())
            .endpoint(reactive_handler),
    )
}

/// The engine's view of a message. `None` for messages without a sender.
fn inbound(msg: &Message) -> Option<Inbound> {
    let sender = msg.from.as_ref()?;
    Some(Inbound {
        chat_id: msg.chat.id.0,
        chat_title: msg.chat.title().map(str::to_string),
        message_id: msg.id.0,
        sender_id: sender.id.0,
        sender_name: sender.first_name.clone(),
        text: msg.text().or_else(|| msg.caption()).map(str::to_string),
    })
}

async fn reactive_handler(msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(inbound) = inbound(&msg) else {
        return Ok(());
    };
    let outcome = state.engine.on_message(&inbound).await;
    if outcome != Outcome::default() {
        debug!(
            "Reactive pass in chat {} for {}: {:?}",
            inbound.chat_id, inbound.sender_id, outcome
        );
    }
    Ok(())
}

/// Record the chat in the background. Recently written chats are skipped;
/// groups also get their member count.
pub fn track_chat(bot: &ThrottledBot, msg: &Message, state: &AppState) {
    let chat_id = msg.chat.id;
    if state.chats.seen_recently(chat_id.0) {
        return;
    }

    let bot = bot.clone();
    let chat = msg.chat.clone();
    let chats = state.chats.clone();
    spawn(async move {
        let member_count = if chat.is_group() || chat.is_supergroup() {
            match bot.get_chat_member_count(chat_id).await {
                Ok(count) => Some(count),
                Err(e) => {
                    warn!("Member count for {} unavailable: {}", chat_id, e);
                    None
                }
            }
        } else {
            None
        };
        let record = ChatRecord::from_telegram(&chat, member_count);
        if let Err(e) = chats.upsert(&record).await {
            warn!("Failed to track chat {}: {}", chat_id, e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_requires_sender() {
        let msg: Message = serde_json::from_value(serde_json::json!({
            "message_id": 10,
            "date": 0,
            "chat": { "id": -100, "type": "supergroup", "title": "Room" },
            "text": "hello"
        }))
        .expect("valid message");
        assert!(inbound(&msg).is_none());
    }

    #[test]
    fn test_inbound_from_group_text() {
        let msg: Message = serde_json::from_value(serde_json::json!({
            "message_id": 11,
            "date": 0,
            "chat": { "id": -100, "type": "supergroup", "title": "Room" },
            "from": { "id": 5, "is_bot": false, "first_name": "Ann" },
            "text": "look"
        }))
        .expect("valid message");
        let inbound = inbound(&msg).expect("has sender");
        assert_eq!(inbound.chat_id, -100);
        assert_eq!(inbound.chat_title.as_deref(), Some("Room"));
        assert_eq!(inbound.sender_id, 5);
        assert_eq!(inbound.text.as_deref(), Some("look"));
    }
}
