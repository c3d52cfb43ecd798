//! Help menus.
//!
//! Each menu command shows its page with the viewer's role; the inline
//! keyboard moves between pages through `help:*` callbacks.

mod menus;

use teloxide::prelude::*;
use teloxide::types::{ParseMode, ReplyParameters};
use tracing::warn;

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::i18n::get_text;
use crate::permissions::Role;
use menus::{with_status, Menu};

/// Role label for a user. Lookup failures show as member.
pub async fn status_label(state: &AppState, user_id: u64) -> &'static str {
    match state.permissions.role(user_id).await {
        Ok(role) => role.label(),
        Err(e) => {
            warn!("Role lookup failed for {}: {}", user_id, e);
            Role::Member.label()
        }
    }
}

async fn send_menu(
    bot: &ThrottledBot,
    msg: &Message,
    state: &AppState,
    menu: Menu,
) -> anyhow::Result<()> {
    let user_id = msg.from.as_ref().map(|u| u.id.0).unwrap_or(0);
    let text = with_status(menu, status_label(state, user_id).await);

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(menu.keyboard())
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}

pub async fn help_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    send_menu(&bot, &msg, &state, Menu::Main).await
}

pub async fn admin_menu_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    send_menu(&bot, &msg, &state, Menu::Admin).await
}

pub async fn topics_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    send_menu(&bot, &msg, &state, Menu::Topics).await
}

pub async fn love_menu_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    send_menu(&bot, &msg, &state, Menu::Love).await
}

pub async fn song_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    send_menu(&bot, &msg, &state, Menu::Song).await
}

pub async fn owner_menu_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    send_menu(&bot, &msg, &state, Menu::Owner).await
}

/// Handle help callback queries (help:*).
pub async fn callback_handler(
    bot: ThrottledBot,
    q: CallbackQuery,
    state: AppState,
) -> anyhow::Result<()> {
    let Some(menu) = q
        .data
        .as_deref()
        .and_then(|d| d.strip_prefix("help:"))
        .and_then(Menu::parse)
    else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    let user_id = q.from.id.0;
    if !state.permissions.allows(user_id, menu.access()).await? {
        bot.answer_callback_query(q.id)
            .text(get_text("common.no_permission"))
            .show_alert(true)
            .await?;
        return Ok(());
    }

    if let Some(message) = &q.message {
        let text = with_status(menu, status_label(&state, user_id).await);
        bot.edit_message_text(message.chat().id, message.id(), text)
            .parse_mode(ParseMode::Html)
            .reply_markup(menu.keyboard())
            .await?;
    }

    bot.answer_callback_query(q.id).await?;
    Ok(())
}
