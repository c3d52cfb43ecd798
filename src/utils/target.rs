//! Target resolution utilities for user commands.
//!
//! Mode and nickname commands take their targets from, in order:
//! 1. the replied-to message's sender
//! 2. text mentions (users without a username)
//! 3. numeric ids and @handles in the arguments

use teloxide::types::{Message, MessageEntityKind};

use super::args::parse_user_refs;
use crate::modes::UserRef;

/// Sender of the replied-to message, if any.
pub fn reply_target_id(msg: &Message) -> Option<u64> {
    msg.reply_to_message()
        .and_then(|reply| reply.from.as_ref())
        .map(|user| user.id.0)
}

/// Every user a command addresses, deduplicated, in the order given.
pub fn command_targets(msg: &Message, args: &str) -> Vec<UserRef> {
    let mut refs = Vec::new();

    if let Some(id) = reply_target_id(msg) {
        refs.push(UserRef::Id(id));
    }

    if let Some(entities) = msg.entities() {
        for entity in entities {
            if let MessageEntityKind::TextMention { user } = &entity.kind {
                refs.push(UserRef::Id(user.id.0));
            }
        }
    }

    for user in parse_user_refs(args) {
        if !refs.contains(&user) {
            refs.push(user);
        }
    }

    refs.dedup();
    refs
}
