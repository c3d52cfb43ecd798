//! User info commands.

use chrono::{FixedOffset, Utc};
use teloxide::prelude::*;
use teloxide::types::User;

use super::help::status_label;
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::i18n::get_text;
use crate::modes::mention;
use crate::utils::{html_escape, reply_html};

/// Myanmar Standard Time, UTC+06:30.
const YANGON_OFFSET_SECS: i32 = 6 * 3600 + 30 * 60;

/// The replied-to sender, else the caller.
fn subject(msg: &Message) -> Option<(&User, bool)> {
    if let Some(user) = msg.reply_to_message().and_then(|r| r.from.as_ref()) {
        return Some((user, true));
    }
    msg.from.as_ref().map(|user| (user, false))
}

fn username_text(user: &User) -> String {
    match &user.username {
        Some(name) => format!("@{}", name),
        None => "No username".to_string(),
    }
}

pub async fn id_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some((user, replied)) = subject(&msg) else {
        return Ok(());
    };
    let name = state.names.sender_name(user.id.0, &user.first_name).await;
    let heading = if replied { "User Info" } else { "Your Info" };
    let text = format!(
        "🆔 <b>{}:</b>\nName: {}\nID: <code>{}</code>\nUsername: {}",
        heading,
        html_escape(&name),
        user.id,
        username_text(user)
    );
    reply_html(&bot, &msg, &text).await
}

pub async fn info_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some((user, replied)) = subject(&msg) else {
        return Ok(());
    };
    let name = state.names.sender_name(user.id.0, &user.first_name).await;
    let heading = if replied { "User Details" } else { "Your Details" };
    let text = format!(
        "ℹ️ <b>{}:</b>\nName: {}\nID: <code>{}</code>\nUsername: {}\nStatus: {}",
        heading,
        html_escape(&name),
        user.id,
        username_text(user),
        status_label(&state, user.id.0).await
    );
    reply_html(&bot, &msg, &text).await
}

pub async fn time_command(bot: ThrottledBot, msg: Message) -> anyhow::Result<()> {
    let text = match FixedOffset::east_opt(YANGON_OFFSET_SECS) {
        Some(tz) => format!(
            "🕐 <b>Myanmar Time:</b>\n{}",
            Utc::now().with_timezone(&tz).format("%Y-%m-%d %H:%M:%S")
        ),
        None => format!(
            "🕐 <b>Current Time (UTC):</b>\n{}",
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        ),
    };
    reply_html(&bot, &msg, &text).await
}

/// Mention the replied user by nickname.
pub async fn use_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(user) = msg.reply_to_message().and_then(|r| r.from.as_ref()) else {
        return reply_html(&bot, &msg, &get_text("info.use_usage")).await;
    };
    let name = state.names.sender_name(user.id.0, &user.first_name).await;
    let text = format!("🎯 Using {}", mention(user.id.0, &name));
    reply_html(&bot, &msg, &text).await
}
