//! Admin roster commands.
//!
//! The roster is the bot's own admin list, independent of chat admin rights.
//! Every change drops the cached role of the affected user.

use teloxide::prelude::*;
use tracing::info;

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::AdminRecord;
use crate::i18n::{get_text, get_text_with};
use crate::modes::mention;
use crate::utils::{html_escape, reply_html, reply_target_id, split_first};

/// Target from the replied message, else the first argument as an id.
fn target_id(msg: &Message, args: &str) -> Option<u64> {
    reply_target_id(msg).or_else(|| split_first(args).0.parse().ok())
}

fn caller_id(msg: &Message) -> u64 {
    msg.from.as_ref().map(|u| u.id.0).unwrap_or(0)
}

async fn username_of(state: &AppState, user_id: u64) -> String {
    match state.users.get(user_id).await {
        Ok(Some(user)) => user
            .username
            .map(|u| format!("@{}", u))
            .unwrap_or_else(|| "No username".to_string()),
        _ => "No username".to_string(),
    }
}

fn limit_text(admin: &AdminRecord) -> String {
    match admin.daily_limit {
        Some(limit) => format!("{}/day", limit),
        None => "No limit".to_string(),
    }
}

pub async fn adminlist_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let roster = state.admins.all().await?;
    if roster.is_empty() {
        return reply_html(&bot, &msg, &get_text("admin.none")).await;
    }

    let mut text = String::from("🛡️ <b>Admin List</b>\n\n");
    for (i, admin) in roster.iter().enumerate() {
        let name = state.names.display_name(admin.user_id).await;
        let status = if admin.banned { "🚫 Banned" } else { "✅ Active" };
        text.push_str(&format!(
            "{}. <b>{}</b>\nID: <code>{}</code>\nUsername: {}\nStatus: {}\nLimit: {}\n\n",
            i + 1,
            html_escape(&name),
            admin.user_id,
            username_of(&state, admin.user_id).await,
            status,
            limit_text(admin)
        ));
    }

    let owners: Vec<String> = state
        .permissions
        .owner_ids()
        .iter()
        .map(|id| format!("<code>{}</code>", id))
        .collect();
    text.push_str(&format!(
        "👑 <b>Owners:</b> {}\n📊 <b>Total Admins:</b> {}",
        owners.join(", "),
        roster.len()
    ));

    reply_html(&bot, &msg, &text).await
}

pub async fn add_admin_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let Some(user_id) = target_id(&msg, &args) else {
        return reply_html(&bot, &msg, &get_text("admin.usage_add")).await;
    };
    if state.is_owner(user_id) {
        return reply_html(&bot, &msg, &get_text("admin.is_owner")).await;
    }

    let key = if state.admins.add(user_id, caller_id(&msg)).await? {
        state.permissions.invalidate(user_id);
        "admin.added"
    } else {
        "admin.already_admin"
    };
    let id = user_id.to_string();
    reply_html(&bot, &msg, &get_text_with(key, &[("id", id.as_str())])).await
}

pub async fn remove_admin_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let Some(user_id) = target_id(&msg, &args) else {
        return reply_html(&bot, &msg, &get_text("admin.usage_remove")).await;
    };

    let key = if state.admins.remove(user_id).await? {
        state.permissions.invalidate(user_id);
        info!("Admin {} removed by {}", user_id, caller_id(&msg));
        "admin.removed"
    } else {
        "admin.not_admin"
    };
    let id = user_id.to_string();
    reply_html(&bot, &msg, &get_text_with(key, &[("id", id.as_str())])).await
}

pub async fn show_admin_id_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let roster = state.admins.all().await?;
    if roster.is_empty() {
        return reply_html(&bot, &msg, &get_text("admin.none")).await;
    }

    let mut text = String::from("👑 <b>Admin IDs</b>\n");
    for admin in &roster {
        let name = state.names.display_name(admin.user_id).await;
        let flag = if admin.banned { "🚫" } else { "✅" };
        text.push_str(&format!(
            "{} <b>{}</b>\n├ ID: <code>{}</code>\n├ Username: {}\n└ Mention: {}\n\n",
            flag,
            html_escape(&name),
            admin.user_id,
            username_of(&state, admin.user_id).await,
            mention(admin.user_id, &name)
        ));
    }
    reply_html(&bot, &msg, &text).await
}

pub async fn ban_admin_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let Some(user_id) = target_id(&msg, &args) else {
        return reply_html(&bot, &msg, &get_text("admin.usage_ban")).await;
    };
    if state.is_owner(user_id) {
        return reply_html(&bot, &msg, &get_text("admin.cannot_ban_owner")).await;
    }

    let key = if state.admins.set_banned(user_id, true).await? {
        state.permissions.invalidate(user_id);
        info!("Admin {} banned by {}", user_id, caller_id(&msg));
        "admin.banned"
    } else {
        "admin.not_admin"
    };
    let id = user_id.to_string();
    reply_html(&bot, &msg, &get_text_with(key, &[("id", id.as_str())])).await
}

pub async fn unban_admin_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let Some(user_id) = target_id(&msg, &args) else {
        return reply_html(&bot, &msg, &get_text("admin.usage_unban")).await;
    };

    let key = if state.admins.set_banned(user_id, false).await? {
        state.permissions.invalidate(user_id);
        "admin.unbanned"
    } else {
        "admin.not_admin"
    };
    let id = user_id.to_string();
    reply_html(&bot, &msg, &get_text_with(key, &[("id", id.as_str())])).await
}

/// Banned roster members.
pub async fn banned_list_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let banned = state.admins.banned().await?;
    if banned.is_empty() {
        return reply_html(&bot, &msg, &get_text("admin.no_banned")).await;
    }

    let mut text = String::from("🚫 <b>Banned Admins</b>\n");
    for admin in &banned {
        let name = state.names.display_name(admin.user_id).await;
        text.push_str(&format!(
            "• {} - <code>{}</code>\n",
            html_escape(&name),
            admin.user_id
        ));
    }
    reply_html(&bot, &msg, &text).await
}

pub async fn admin_limit_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let (first, rest) = split_first(&args);
    let parsed = first
        .parse::<u64>()
        .ok()
        .zip(split_first(rest).0.parse::<i64>().ok().filter(|n| *n >= 0));
    let Some((user_id, limit)) = parsed else {
        return reply_html(&bot, &msg, &get_text("admin.usage_limit")).await;
    };

    let key = if state.admins.set_limit(user_id, Some(limit)).await? {
        "admin.limit_set"
    } else {
        "admin.not_admin"
    };
    let (id, limit) = (user_id.to_string(), limit.to_string());
    let text = get_text_with(key, &[("id", id.as_str()), ("limit", limit.as_str())]);
    reply_html(&bot, &msg, &text).await
}

pub async fn admin_unlimit_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let Some(user_id) = target_id(&msg, &args) else {
        return reply_html(&bot, &msg, &get_text("admin.usage_unlimit")).await;
    };

    let key = if state.admins.set_limit(user_id, None).await? {
        "admin.limit_removed"
    } else {
        "admin.not_admin"
    };
    let id = user_id.to_string();
    reply_html(&bot, &msg, &get_text_with(key, &[("id", id.as_str())])).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_text() {
        let mut admin = AdminRecord::new(5, None);
        assert_eq!(limit_text(&admin), "No limit");
        admin.daily_limit = Some(20);
        assert_eq!(limit_text(&admin), "20/day");
    }
}
