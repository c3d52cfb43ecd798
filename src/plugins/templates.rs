//! Fight and love template commands.

use teloxide::prelude::*;
use tracing::info;

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::i18n::{get_text, get_text_with};
use crate::modes::{Category, TemplateStore};
use crate::utils::{html_escape, parse_id_list, reply_html};

/// Argument text, else the replied message's text or caption.
fn template_text(msg: &Message, args: &str) -> Option<String> {
    let args = args.trim();
    if !args.is_empty() {
        return Some(args.to_string());
    }
    msg.reply_to_message()
        .and_then(|r| r.text().or_else(|| r.caption()))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

async fn add(
    bot: &ThrottledBot,
    msg: &Message,
    state: &AppState,
    category: Category,
    args: &str,
) -> anyhow::Result<()> {
    let Some(text) = template_text(msg, args) else {
        let key = match category {
            Category::Generic => "templates.usage_add",
            Category::Affection => "templates.usage_add_love",
        };
        return reply_html(bot, msg, &get_text(key)).await;
    };

    let id = state.templates.add(category, &text).await?;
    info!("Added {} template {} from chat {}", category, id, msg.chat.id);
    let id = id.to_string();
    reply_html(bot, msg, &get_text_with("templates.added", &[("id", id.as_str())])).await
}

async fn list(
    bot: &ThrottledBot,
    msg: &Message,
    state: &AppState,
    category: Category,
) -> anyhow::Result<()> {
    let templates = state.templates.list(category).await?;
    if templates.is_empty() {
        return reply_html(bot, msg, &get_text("templates.empty")).await;
    }

    let heading = match category {
        Category::Generic => "📝 <b>Fight Templates</b>",
        Category::Affection => "💕 <b>Love Templates</b>",
    };
    let mut text = format!("{} ({})\n\n", heading, templates.len());
    for template in &templates {
        text.push_str(&format!(
            "<code>{}</code>: {}\n",
            template.id,
            html_escape(&template.text)
        ));
    }
    reply_html(bot, msg, &text).await
}

async fn remove(
    bot: &ThrottledBot,
    msg: &Message,
    state: &AppState,
    category: Category,
    args: &str,
) -> anyhow::Result<()> {
    let ids = match parse_id_list(args) {
        Ok(ids) => ids,
        Err(e) => {
            let error = html_escape(&e.to_string());
            let text = get_text_with("templates.usage_remove", &[("error", error.as_str())]);
            return reply_html(bot, msg, &text).await;
        }
    };

    let mut removed = Vec::new();
    let mut missing = Vec::new();
    for id in ids {
        if state.templates.remove(category, id).await? {
            removed.push(id.to_string());
        } else {
            missing.push(id.to_string());
        }
    }

    let mut text = String::new();
    if !removed.is_empty() {
        let ids = removed.join(", ");
        text.push_str(&get_text_with("templates.removed", &[("ids", ids.as_str())]));
    }
    if !missing.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        let ids = missing.join(", ");
        text.push_str(&get_text_with("templates.missing", &[("ids", ids.as_str())]));
    }
    reply_html(bot, msg, &text).await
}

pub async fn add_message_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    add(&bot, &msg, &state, Category::Generic, &args).await
}

pub async fn list_message_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    list(&bot, &msg, &state, Category::Generic).await
}

pub async fn remove_message_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    remove(&bot, &msg, &state, Category::Generic, &args).await
}

pub async fn add_love_message_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    add(&bot, &msg, &state, Category::Affection, &args).await
}

pub async fn list_love_messages_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    list(&bot, &msg, &state, Category::Affection).await
}

pub async fn remove_love_message_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    remove(&bot, &msg, &state, Category::Affection, &args).await
}
