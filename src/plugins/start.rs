//! /start command plugin.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode, ReplyParameters};

use super::help::{help_command, status_label};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::i18n::get_text_with;

/// Handle /start, including the `help` deep link.
pub async fn start_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    if args.trim() == "help" {
        return help_command(bot, msg, state).await;
    }

    let user_id = msg.from.as_ref().map(|u| u.id.0).unwrap_or(0);
    let text = get_text_with(
        "start.greeting",
        &[
            ("bot", state.bot_username.as_str()),
            ("status", status_label(&state, user_id).await),
        ],
    );

    let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "📚 Help",
        "help:main",
    )]]);

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}
