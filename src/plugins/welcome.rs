//! Welcome command handlers.
//!
//! One global switch and text; the greeting itself is sent by
//! `events::welcome` when members join.

use teloxide::prelude::*;
use tracing::info;

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::i18n::{get_text, get_text_with};
use crate::utils::{html_escape, reply_html};

/// Handle /welcome - toggle welcome mode.
pub async fn welcome_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let enabled = state.settings.toggle_welcome();
    info!("Welcome mode {} by {:?}", enabled, msg.from.as_ref().map(|u| u.id));
    let key = if enabled { "welcome.enabled" } else { "welcome.disabled" };
    reply_html(&bot, &msg, &get_text(key)).await
}

/// Handle /welcome_mode - show the switch and the current text.
pub async fn welcome_mode_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let status = if state.settings.welcome_enabled() { "ON" } else { "OFF" };
    let text = html_escape(&state.settings.welcome_text());
    let reply = get_text_with(
        "welcome.status",
        &[("status", status), ("text", text.as_str())],
    );
    reply_html(&bot, &msg, &reply).await
}

/// Handle /welcome_text - replace the greeting. `{name}` and `{username}`
/// are filled in per member.
pub async fn welcome_text_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let text = args.trim();
    if text.is_empty() {
        return reply_html(&bot, &msg, &get_text("welcome.usage_text")).await;
    }

    state.settings.set_welcome_text(text);
    let preview = html_escape(text);
    reply_html(
        &bot,
        &msg,
        &get_text_with("welcome.text_set", &[("text", preview.as_str())]),
    )
    .await
}
