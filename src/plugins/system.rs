//! Status views, shutdown and owner broadcasts.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode};
use tracing::{info, warn};

use super::help::status_label;
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::AdminRecord;
use crate::i18n::{get_text, get_text_with};
use crate::modes::{Category, EngineStats};
use crate::utils::{html_escape, reply_html};

const EMERGENCY_CALLBACK: &str = "dash_emergency";
const REFRESH_CALLBACK: &str = "dash_refresh";

fn on_off(flag: bool) -> &'static str {
    if flag {
        "ON"
    } else {
        "OFF"
    }
}

fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (days, hours, mins) = (secs / 86_400, (secs % 86_400) / 3600, (secs % 3600) / 60);
    if days > 0 {
        format!("{}d {}h {}m", days, hours, mins)
    } else if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m {}s", mins, secs % 60)
    }
}

fn modes_block(stats: &EngineStats) -> String {
    let r = &stats.registry;
    format!(
        "⚔️ <b>Active Modes</b>\n\
         Fight Loops: {}\n\
         Love Loops: {}\n\
         Fight Targets: {}\n\
         Love Targets: {}\n\
         Troll Targets: {}\n\
         Love Troll Targets: {}\n\
         Funny Pairs: {}\n\
         Love Funny Pairs: {}\n\
         Hidden Users: {}\n\
         Secret Monitoring: {} chats",
        stats.fight_loops,
        stats.love_loops,
        r.fight_targets,
        r.love_targets,
        r.troll_targets,
        r.love_troll_targets,
        r.funny_pairs,
        r.love_funny_pairs,
        r.hidden_users,
        r.monitored_chats
    )
}

/// Everyone a broadcast reaches: tracked users, the roster, nicknamed users
/// and current mode targets.
fn audience(
    users: Vec<u64>,
    admins: &[AdminRecord],
    nicknamed: Vec<u64>,
    targets: impl IntoIterator<Item = u64>,
) -> BTreeSet<u64> {
    users
        .into_iter()
        .chain(admins.iter().map(|a| a.user_id))
        .chain(nicknamed)
        .chain(targets)
        .filter(|id| *id != 0)
        .collect()
}

pub async fn preview_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let user_id = msg.from.as_ref().map(|u| u.id.0).unwrap_or(0);
    let admins = state.admins.all().await?.len();
    let active_chats = state.chats.active().await?.len();
    let (folders, tracks) = state.music.counts().await?;
    let fight = state.templates.count(Category::Generic).await?;
    let love = state.templates.count(Category::Affection).await?;

    let text = format!(
        "📊 <b>Bot Preview</b>\n\n\
         🛡️ <b>Administration</b>\n\
         Admins: {}\n\
         Active Chats: {}\n\n\
         🎵 <b>Music</b>\n\
         Folders: {}\n\
         Tracks: {}\n\n\
         📝 <b>Templates</b>\n\
         Fight Messages: {}\n\
         Love Messages: {}\n\n\
         {}\n\n\
         👤 <b>Your Status:</b> {}",
        admins,
        active_chats,
        folders,
        tracks,
        fight,
        love,
        modes_block(&state.engine.stats()),
        status_label(&state, user_id).await
    );
    reply_html(&bot, &msg, &text).await
}

pub async fn gp_list_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let chats: Vec<_> = state
        .chats
        .all()
        .await?
        .into_iter()
        .filter(|c| c.is_group())
        .collect();
    if chats.is_empty() {
        return reply_html(&bot, &msg, &get_text("system.no_groups")).await;
    }

    let mut text = format!("📋 <b>Group List</b> ({})\n\n", chats.len());
    for chat in &chats {
        let title = chat.title.as_deref().unwrap_or("Unknown");
        let username = chat
            .username
            .as_ref()
            .map(|u| format!("@{}", u))
            .unwrap_or_else(|| "No username".to_string());
        let members = chat
            .member_count
            .map(|n| n.to_string())
            .unwrap_or_else(|| "?".to_string());
        let status = if chat.active { "🟢 Active" } else { "🔴 Inactive" };
        let seen = chrono::DateTime::from_timestamp(chat.last_seen, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();

        text.push_str(&format!(
            "🏢 <b>{}</b>\nID: <code>{}</code>\nType: {}\nUsername: {}\n\
             Members: {}\nStatus: {}\nLast Seen: {}\n\n",
            html_escape(title),
            chat.chat_id,
            chat.chat_type,
            username,
            members,
            status,
            seen
        ));
    }
    reply_html(&bot, &msg, &text).await
}

// --- Dashboard ---

async fn dashboard_text(bot: &ThrottledBot, state: &AppState) -> anyhow::Result<String> {
    let admins = state.admins.all().await?;
    let banned = admins.iter().filter(|a| a.banned).count();
    let limited = admins.iter().filter(|a| a.daily_limit.is_some()).count();

    let chats = state.chats.all().await?;
    let active = chats.iter().filter(|c| c.active).count();
    let members: u64 = chats
        .iter()
        .filter(|c| c.active)
        .filter_map(|c| c.member_count)
        .map(u64::from)
        .sum();

    let started = Instant::now();
    let latency = match bot.get_me().await {
        Ok(_) => format!("{}ms", started.elapsed().as_millis()),
        Err(e) => {
            warn!("getMe failed during dashboard: {}", e);
            "unreachable".to_string()
        }
    };

    let owners: Vec<String> = state
        .permissions
        .owner_ids()
        .iter()
        .map(|id| format!("<code>{}</code>", id))
        .collect();

    Ok(format!(
        "📊 <b>Owner Dashboard</b>\n\n\
         📈 <b>Overview</b>\n\
         Chats: {} ({} active)\n\
         Members: {}\n\
         Admins: {} ({} banned)\n\
         Limited Admins: {}\n\
         Known Users: {}\n\n\
         {}\n\n\
         🔋 <b>Settings</b>\n\
         Speed Delay: {}s\n\
         Welcome Mode: {}\n\
         Speed Permission: {}\n\n\
         ⏱️ Uptime: {} | API: {} | Caches: {}\n\
         👑 Owners: {}",
        chats.len(),
        active,
        members,
        admins.len(),
        banned,
        limited,
        state.users.count().await?,
        modes_block(&state.engine.stats()),
        state.engine.tick_delay().as_secs_f64(),
        on_off(state.settings.welcome_enabled()),
        on_off(state.settings.speed_for_admins()),
        format_uptime(state.started_at.elapsed()),
        latency,
        state.cache.cache_count(),
        owners.join(", ")
    ))
}

fn dashboard_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("🔄 Refresh", REFRESH_CALLBACK)],
        vec![InlineKeyboardButton::callback(
            "🚫 Emergency Stop",
            EMERGENCY_CALLBACK,
        )],
    ])
}

pub async fn dashboard_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let text = dashboard_text(&bot, &state).await?;
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(dashboard_keyboard())
        .await?;
    Ok(())
}

/// Dashboard buttons. Owner only, checked here since callbacks skip the
/// command guard.
pub async fn dashboard_callback(
    bot: ThrottledBot,
    q: CallbackQuery,
    state: AppState,
) -> anyhow::Result<()> {
    if !state.is_owner(q.from.id.0) {
        bot.answer_callback_query(q.id)
            .text(get_text("common.owner_only"))
            .show_alert(true)
            .await?;
        return Ok(());
    }

    match q.data.as_deref() {
        Some(EMERGENCY_CALLBACK) => {
            let stopped = state.engine.emergency_stop_all();
            info!("Emergency stop by {}: {} loop(s) stopped", q.from.id, stopped);
            let stopped = stopped.to_string();
            let text = get_text_with("system.emergency_done", &[("loops", stopped.as_str())]);
            if let Some(message) = &q.message {
                bot.send_message(message.chat().id, text.clone())
                    .parse_mode(ParseMode::Html)
                    .await?;
            }
            bot.answer_callback_query(q.id).text(text).await?;
        }
        Some(REFRESH_CALLBACK) => {
            if let Some(message) = &q.message {
                let text = dashboard_text(&bot, &state).await?;
                bot.edit_message_text(message.chat().id, message.id(), text)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(dashboard_keyboard())
                    .await?;
            }
            bot.answer_callback_query(q.id).await?;
        }
        _ => {
            bot.answer_callback_query(q.id).await?;
        }
    }
    Ok(())
}

// --- Lifecycle ---

pub async fn shutdown_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let stopped = state.engine.emergency_stop_all();
    info!(
        "Shutdown requested by {:?}: {} loop(s) stopped",
        msg.from.as_ref().map(|u| u.id),
        stopped
    );
    reply_html(&bot, &msg, &get_text("system.shutting_down")).await?;
    std::process::exit(0);
}

// --- Broadcast ---

/// Copy the replied message to every active chat. Chats that reject it are
/// marked inactive.
pub async fn upload_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let Some(source) = msg.reply_to_message() else {
        return reply_html(&bot, &msg, &get_text("system.usage_upload")).await;
    };
    let chats = state.chats.active().await?;
    if chats.is_empty() {
        return reply_html(&bot, &msg, &get_text("system.no_active_chats")).await;
    }

    let (mut sent, mut failed) = (0usize, 0usize);
    for chat in &chats {
        match copy_to(&bot, ChatId(chat.chat_id), msg.chat.id, source.id).await {
            Ok(()) => sent += 1,
            Err(e) => {
                failed += 1;
                warn!("Upload to {} failed: {}", chat.chat_id, e);
                if let Err(e) = state.chats.mark_inactive(chat.chat_id).await {
                    warn!("Failed to mark chat {} inactive: {}", chat.chat_id, e);
                }
            }
        }
    }

    let (sent, failed) = (sent.to_string(), failed.to_string());
    let text = get_text_with(
        "system.upload_done",
        &[("sent", sent.as_str()), ("failed", failed.as_str())],
    );
    reply_html(&bot, &msg, &text).await
}

async fn copy_to(
    bot: &ThrottledBot,
    to: ChatId,
    from: ChatId,
    message_id: MessageId,
) -> Result<(), teloxide::RequestError> {
    bot.copy_message(to, from, message_id).await?;
    Ok(())
}

/// `/broadcast text`, or reply to any message to copy it.
pub async fn broadcast_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let text = args.trim();
    let source = msg.reply_to_message();
    if text.is_empty() && source.is_none() {
        return reply_html(&bot, &msg, &get_text("system.usage_broadcast")).await;
    }

    let recipients = audience(
        state.users.ids().await?,
        &state.admins.all().await?,
        state.nicknames.user_ids().await?,
        state.engine.known_users(),
    );
    if recipients.is_empty() {
        return reply_html(&bot, &msg, &get_text("system.no_users")).await;
    }

    let mut sent = 0usize;
    for user in &recipients {
        let to = ChatId(*user as i64);
        let result = match source {
            Some(source) => copy_to(&bot, to, msg.chat.id, source.id).await,
            None => bot.send_message(to, text).await.map(|_| ()),
        };
        match result {
            Ok(()) => sent += 1,
            Err(e) => warn!("Broadcast to {} failed: {}", user, e),
        }
    }
    info!("Broadcast delivered to {}/{} users", sent, recipients.len());

    let (sent, total) = (sent.to_string(), recipients.len().to_string());
    let text = get_text_with(
        "system.broadcast_done",
        &[("sent", sent.as_str()), ("total", total.as_str())],
    );
    reply_html(&bot, &msg, &text).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(75)), "1m 15s");
        assert_eq!(format_uptime(Duration::from_secs(2 * 3600 + 300)), "2h 5m");
        assert_eq!(format_uptime(Duration::from_secs(90_000)), "1d 1h 0m");
    }

    #[test]
    fn test_audience_merges_and_dedups() {
        let admins = vec![AdminRecord::new(2, None), AdminRecord::new(3, None)];
        let all = audience(vec![1, 2], &admins, vec![3, 4], [4, 5, 0]);
        assert_eq!(all.into_iter().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_modes_block_lists_counts() {
        let mut stats = EngineStats::default();
        stats.fight_loops = 2;
        stats.registry.hidden_users = 7;
        let block = modes_block(&stats);
        assert!(block.contains("Fight Loops: 2"));
        assert!(block.contains("Hidden Users: 7"));
    }
}
