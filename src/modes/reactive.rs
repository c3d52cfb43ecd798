//! Reactive dispatcher - runs on every inbound group message.
//!
//! Stage order is fixed:
//! 1. hide: delete the message and stop (a failed delete falls through)
//! 2. monitor: forward a summary to the operators
//! 3. troll: reply with the sender's next template (affection, then generic)
//! 4. pair: relay the sender's text at the other half of the pair
//!
//! Stages 2-4 run independently of each other's outcome.

use std::sync::Arc;

use tracing::{debug, warn};

use super::names::{mention, NameResolver};
use super::registry::{NextTemplate, TargetRegistry};
use super::templates::TemplateStore;
use super::{Messenger, PairMode, ReactiveMode, TargetKind};
use crate::error::BotResult;
use crate::utils::html_escape;

/// Placeholder used when a message carries no text.
const MEDIA_PLACEHOLDER: &str = "Media/Other";

/// An inbound group message as the dispatcher sees it.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub chat_id: i64,
    pub chat_title: Option<String>,
    pub message_id: i32,
    pub sender_id: u64,
    /// Platform first name of the sender.
    pub sender_name: String,
    /// Text or caption, `None` for media without caption.
    pub text: Option<String>,
}

/// What the dispatcher did with one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub deleted: bool,
    pub forwarded: usize,
    pub troll_replies: usize,
    pub pair_replies: usize,
}

pub struct ReactiveDispatcher {
    registry: Arc<TargetRegistry>,
    templates: Arc<dyn TemplateStore>,
    names: NameResolver,
    messenger: Arc<dyn Messenger>,
    /// Users that receive monitor forwards (bot owners).
    operators: Vec<u64>,
}

impl ReactiveDispatcher {
    pub fn new(
        registry: Arc<TargetRegistry>,
        templates: Arc<dyn TemplateStore>,
        names: NameResolver,
        messenger: Arc<dyn Messenger>,
        operators: Vec<u64>,
    ) -> Self {
        Self {
            registry,
            templates,
            names,
            messenger,
            operators,
        }
    }

    /// Run all stages for one message.
    pub async fn handle(&self, msg: &Inbound) -> Outcome {
        let mut outcome = Outcome::default();

        if self.registry.is_hidden(msg.chat_id, msg.sender_id) {
            match self.messenger.delete(msg.chat_id, msg.message_id).await {
                Ok(()) => {
                    debug!("Deleted hidden message from {} in chat {}", msg.sender_id, msg.chat_id);
                    outcome.deleted = true;
                    return outcome;
                }
                Err(e) => debug!("Could not delete hidden message in chat {}: {}", msg.chat_id, e),
            }
        }

        if !self.is_relevant(msg) {
            return outcome;
        }

        let name = self.names.sender_name(msg.sender_id, &msg.sender_name).await;
        let sender = mention(msg.sender_id, &name);

        if self.registry.is_monitored(msg.chat_id) && !self.operators.contains(&msg.sender_id) {
            outcome.forwarded = self.forward(msg, &sender).await;
        }

        for mode in [ReactiveMode::LoveTroll, ReactiveMode::Troll] {
            match self.troll(mode, msg, &sender).await {
                Ok(true) => outcome.troll_replies += 1,
                Ok(false) => {}
                Err(e) => warn!("{} reply failed in chat {}: {}", mode, msg.chat_id, e),
            }
        }

        for mode in [PairMode::LoveFunny, PairMode::Funny] {
            match self.pair(mode, msg, &sender).await {
                Ok(true) => outcome.pair_replies += 1,
                Ok(false) => {}
                Err(e) => warn!("{} reply failed in chat {}: {}", mode, msg.chat_id, e),
            }
        }

        outcome
    }

    /// Whether any stage after hide could fire for this message.
    fn is_relevant(&self, msg: &Inbound) -> bool {
        let (chat, user) = (msg.chat_id, msg.sender_id);
        self.registry.is_monitored(chat)
            || self.registry.contains(ReactiveMode::Troll.into(), chat, user)
            || self.registry.contains(ReactiveMode::LoveTroll.into(), chat, user)
            || self.registry.pair(PairMode::Funny, chat).is_some()
            || self.registry.pair(PairMode::LoveFunny, chat).is_some()
    }

    /// Forward a summary to every operator. Returns how many got it.
    async fn forward(&self, msg: &Inbound, sender: &str) -> usize {
        let title = msg.chat_title.as_deref().unwrap_or("Unknown");
        let body = msg.text.as_deref().unwrap_or(MEDIA_PLACEHOLDER);
        let summary = format!(
            "🕵️ <b>Secret Monitor</b>\n🏷️ Chat: {}\n👤 User: {}\n💬 Message: {}",
            html_escape(title),
            sender,
            html_escape(body)
        );

        let mut delivered = 0;
        for &operator in &self.operators {
            match self.messenger.send(operator as i64, &summary).await {
                Ok(()) => delivered += 1,
                Err(e) => debug!("Monitor forward to {} failed: {}", operator, e),
            }
        }
        delivered
    }

    async fn troll(&self, mode: ReactiveMode, msg: &Inbound, sender: &str) -> BotResult<bool> {
        let kind = TargetKind::Reactive(mode);
        if !self.registry.contains(kind, msg.chat_id, msg.sender_id) {
            return Ok(false);
        }

        let templates = self.templates.list(mode.category()).await?;
        let (text, cursor) =
            match self.registry.next_template(kind, msg.chat_id, msg.sender_id, &templates) {
                NextTemplate::Ready { text, cursor } => (text, cursor),
                NextTemplate::NoTemplates | NextTemplate::NotTargeted => return Ok(false),
            };

        let reply = match mode {
            ReactiveMode::Troll => format!("{} : {}", sender, html_escape(&text)),
            ReactiveMode::LoveTroll => format!("{} 💕 {} 😘", sender, html_escape(&text)),
        };
        self.messenger
            .send_reply(msg.chat_id, msg.message_id, &reply)
            .await?;
        self.registry.advance(kind, msg.chat_id, msg.sender_id, cursor);
        Ok(true)
    }

    async fn pair(&self, mode: PairMode, msg: &Inbound, sender: &str) -> BotResult<bool> {
        let Some(pair) = self.registry.pair(mode, msg.chat_id) else {
            return Ok(false);
        };
        let Some(other_id) = pair.partner(msg.sender_id) else {
            return Ok(false);
        };

        let other = self.names.mention(other_id).await;
        let said = html_escape(msg.text.as_deref().unwrap_or(MEDIA_PLACEHOLDER));
        let reply = compose_pair(mode, pair.cursor, sender, &other, &said);

        self.messenger
            .send_reply(msg.chat_id, msg.message_id, &reply)
            .await?;
        self.registry.advance_pair(mode, msg.chat_id, pair.cursor);
        Ok(true)
    }
}

/// Pair reply text. Affection pairs rotate through their phrasings.
fn compose_pair(mode: PairMode, cursor: usize, sender: &str, other: &str, said: &str) -> String {
    match mode {
        PairMode::Funny => format!(
            "{} is telling {}: '{}' 😈 Don't just sit there, answer back!",
            sender, other, said
        ),
        PairMode::LoveFunny => match cursor % 3 {
            0 => format!("{} is whispering '{}' to {} 💖", sender, said, other),
            1 => format!("{}, listen... {} says '{}' and it's all about you 💝", other, sender, said),
            _ => format!("The lovebirds {} and {}: '{}' 💕", sender, other, said),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::Category;
    use crate::modes::testing::Harness;

    const TROLL: TargetKind = TargetKind::Reactive(ReactiveMode::Troll);

    fn message(chat_id: i64, sender_id: u64, text: &str) -> Inbound {
        Inbound {
            chat_id,
            chat_title: Some("Group".into()),
            message_id: 100,
            sender_id,
            sender_name: format!("user{}", sender_id),
            text: Some(text.into()),
        }
    }

    #[tokio::test]
    async fn test_hidden_sender_is_deleted_and_nothing_else_fires() {
        let h = Harness::new();
        h.add_templates(Category::Generic, &["t"]).await;
        h.registry.hide(1, &[99]);
        h.registry.add_targets(TROLL, 1, &[99]);
        h.registry.set_pair(PairMode::Funny, 1, 99, 2);
        h.registry.set_monitor(1, true);
        let dispatcher = h.dispatcher(vec![500]);

        let outcome = dispatcher.handle(&message(1, 99, "hello")).await;

        assert!(outcome.deleted);
        assert_eq!(outcome, Outcome { deleted: true, ..Default::default() });
        assert_eq!(h.messenger.deleted(), vec![(1, 100)]);
        assert!(h.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_falls_through_to_other_stages() {
        let h = Harness::new();
        h.add_templates(Category::Generic, &["t"]).await;
        h.registry.hide(1, &[99]);
        h.registry.add_targets(TROLL, 1, &[99]);
        h.messenger.deny_delete(true);
        let dispatcher = h.dispatcher(vec![]);

        let outcome = dispatcher.handle(&message(1, 99, "hello")).await;

        assert!(!outcome.deleted);
        assert_eq!(outcome.troll_replies, 1);
    }

    #[tokio::test]
    async fn test_pair_reply_mentions_partner_and_text() {
        let h = Harness::new();
        h.messenger.set_name(2, "Bob");
        h.registry.set_pair(PairMode::Funny, 1, 1, 2);
        let dispatcher = h.dispatcher(vec![]);

        let outcome = dispatcher.handle(&message(1, 1, "hi")).await;
        assert_eq!(outcome.pair_replies, 1);
        let sent = h.messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].reply_to, Some(100));
        assert!(sent[0].text.contains("tg://user?id=2"));
        assert!(sent[0].text.contains("Bob"));
        assert!(sent[0].text.contains("'hi'"));

        let outcome = dispatcher.handle(&message(1, 3, "hi")).await;
        assert_eq!(outcome.pair_replies, 0);
        assert_eq!(h.messenger.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_love_pair_phrasing_rotates() {
        let h = Harness::new();
        h.registry.set_pair(PairMode::LoveFunny, 1, 1, 2);
        let dispatcher = h.dispatcher(vec![]);

        for _ in 0..3 {
            dispatcher.handle(&message(1, 2, "x")).await;
        }
        let texts: Vec<String> = h.messenger.sent().into_iter().map(|s| s.text).collect();
        assert!(texts[0].contains("whispering"));
        assert!(texts[1].contains("listen"));
        assert!(texts[2].contains("lovebirds"));
    }

    #[tokio::test]
    async fn test_troll_cycles_and_both_tables_fire() {
        let h = Harness::new();
        h.add_templates(Category::Generic, &["g1", "g2"]).await;
        h.add_templates(Category::Affection, &["a1"]).await;
        h.registry.add_targets(TROLL, 1, &[7]);
        h.registry
            .add_targets(TargetKind::Reactive(ReactiveMode::LoveTroll), 1, &[7]);
        let dispatcher = h.dispatcher(vec![]);

        let first = dispatcher.handle(&message(1, 7, "a")).await;
        assert_eq!(first.troll_replies, 2);
        dispatcher.handle(&message(1, 7, "b")).await;
        dispatcher.handle(&message(1, 7, "c")).await;

        let generic: Vec<String> = h
            .messenger
            .sent()
            .into_iter()
            .map(|s| s.text)
            .filter(|t| !t.contains("💕"))
            .collect();
        assert!(generic[0].ends_with(": g1"));
        assert!(generic[1].ends_with(": g2"));
        assert!(generic[2].ends_with(": g1"));
    }

    #[tokio::test]
    async fn test_failed_reply_keeps_cursor() {
        let h = Harness::new();
        h.add_templates(Category::Generic, &["g1", "g2"]).await;
        h.registry.add_targets(TROLL, 1, &[7]);
        h.messenger.fail_next_sends(1);
        let dispatcher = h.dispatcher(vec![]);

        let outcome = dispatcher.handle(&message(1, 7, "a")).await;
        assert_eq!(outcome.troll_replies, 0);
        assert_eq!(h.registry.cursor(TROLL, 1, 7), Some(0));

        dispatcher.handle(&message(1, 7, "b")).await;
        assert!(h.messenger.sent()[0].text.ends_with(": g1"));
    }

    #[tokio::test]
    async fn test_monitor_forwards_to_operators_except_their_own_messages() {
        let h = Harness::new();
        h.registry.set_monitor(1, true);
        let dispatcher = h.dispatcher(vec![500]);

        let outcome = dispatcher.handle(&message(1, 8, "secret")).await;
        assert_eq!(outcome.forwarded, 1);
        let sent = h.messenger.sent();
        assert_eq!(sent[0].chat_id, 500);
        assert!(sent[0].text.contains("Group"));
        assert!(sent[0].text.contains("secret"));

        let outcome = dispatcher.handle(&message(1, 500, "mine")).await;
        assert_eq!(outcome.forwarded, 0);
    }

    #[tokio::test]
    async fn test_unrelated_message_does_nothing() {
        let h = Harness::new();
        let dispatcher = h.dispatcher(vec![500]);
        let outcome = dispatcher.handle(&message(1, 8, "hi")).await;
        assert_eq!(outcome, Outcome::default());
        assert!(h.messenger.sent().is_empty());
    }
}
