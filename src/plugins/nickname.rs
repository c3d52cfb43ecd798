//! Nickname commands. Nicknames replace the platform name in every mention.

use teloxide::prelude::*;

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::i18n::{get_text, get_text_with};
use crate::modes::{mention, UserRef};
use crate::utils::{reply_html, reply_target_id, split_first};

/// Resolve the addressed user. With a reply the whole argument string is
/// left over; otherwise the first word is the user reference.
async fn addressed<'a>(
    state: &AppState,
    msg: &Message,
    args: &'a str,
) -> Option<(u64, &'a str)> {
    if let Some(id) = reply_target_id(msg) {
        return Some((id, args.trim()));
    }
    let (first, rest) = split_first(args);
    let user = UserRef::parse(first)?;
    let id = state.engine.resolve(&[user]).await.into_iter().next()?;
    Some((id, rest))
}

pub async fn name_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let Some((user_id, nickname)) = addressed(&state, &msg, &args).await else {
        return reply_html(&bot, &msg, &get_text("nickname.usage_name")).await;
    };
    if nickname.is_empty() {
        return reply_html(&bot, &msg, &get_text("nickname.usage_name")).await;
    }

    state.nicknames.set(user_id, nickname).await?;
    let tag = mention(user_id, nickname);
    reply_html(&bot, &msg, &get_text_with("nickname.set", &[("user", tag.as_str())])).await
}

pub async fn remove_name_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let Some((user_id, _)) = addressed(&state, &msg, &args).await else {
        return reply_html(&bot, &msg, &get_text("nickname.usage_remove")).await;
    };

    let key = if state.nicknames.remove(user_id).await? {
        "nickname.removed"
    } else {
        "nickname.none"
    };
    let id = user_id.to_string();
    reply_html(&bot, &msg, &get_text_with(key, &[("id", id.as_str())])).await
}
