//! Mode commands: loops, reactive targets, pairs, hide, monitor and speed.
//!
//! Everything here is a thin layer over `ModeEngine`; the guard at the router
//! has already checked the caller's role.

use teloxide::prelude::*;

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::error::BotError;
use crate::i18n::{get_text, get_text_with};
use crate::modes::{Category, LoopMode, PairMode, ReactiveMode, TemplateStore};
use crate::utils::{command_targets, html_escape, reply_html};

/// Reply for errors the caller can fix. Anything else is a handler error.
async fn report(bot: &ThrottledBot, msg: &Message, err: BotError) -> anyhow::Result<()> {
    let text = match &err {
        BotError::NotFound(what) => {
            let what = html_escape(what);
            get_text_with("modes.not_found", &[("users", what.as_str())])
        }
        BotError::Config(why) => {
            let why = html_escape(why);
            get_text_with("modes.invalid", &[("error", why.as_str())])
        }
        _ => return Err(err.into()),
    };
    reply_html(bot, msg, &text).await
}

async fn mentions(state: &AppState, users: &[u64]) -> String {
    let mut out = Vec::with_capacity(users.len());
    for user in users {
        out.push(state.names.mention(*user).await);
    }
    out.join(", ")
}

// --- Loops ---

async fn start_loop(
    bot: &ThrottledBot,
    msg: &Message,
    state: &AppState,
    mode: LoopMode,
    args: &str,
) -> anyhow::Result<()> {
    let refs = command_targets(msg, args);
    if refs.is_empty() {
        let key = match mode {
            LoopMode::Fight => "modes.usage_fight",
            LoopMode::Love => "modes.usage_love",
        };
        return reply_html(bot, msg, &get_text(key)).await;
    }

    let started = match state.engine.start_loop(mode, msg.chat.id.0, &refs).await {
        Ok(started) => started,
        Err(e) => return report(bot, msg, e).await,
    };

    let users = mentions(state, &started.users).await;
    let key = match (mode, started.spawned) {
        (LoopMode::Fight, true) => "modes.fight_started",
        (LoopMode::Love, true) => "modes.love_started",
        (_, false) => "modes.targets_merged",
    };
    let mut text = get_text_with(key, &[("users", users.as_str())]);

    if state.templates.list(mode.category()).await?.is_empty() {
        text.push_str("\n\n");
        text.push_str(&get_text("modes.no_templates"));
    }
    reply_html(bot, msg, &text).await
}

pub async fn fight_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    start_loop(&bot, &msg, &state, LoopMode::Fight, &args).await
}

pub async fn love_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    start_loop(&bot, &msg, &state, LoopMode::Love, &args).await
}

/// `/stop fight|love`
pub async fn stop_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let Some(mode) = LoopMode::parse(args.trim()) else {
        return reply_html(&bot, &msg, &get_text("modes.usage_stop")).await;
    };

    let key = if state.engine.stop_loop(mode, msg.chat.id.0) {
        "modes.loop_stopped"
    } else {
        "modes.loop_not_running"
    };
    reply_html(&bot, &msg, &get_text_with(key, &[("mode", mode.as_str())])).await
}

// --- Reactive ---

async fn add_reactive(
    bot: &ThrottledBot,
    msg: &Message,
    state: &AppState,
    mode: ReactiveMode,
    args: &str,
) -> anyhow::Result<()> {
    let refs = command_targets(msg, args);
    if refs.is_empty() {
        let key = match mode {
            ReactiveMode::Troll => "modes.usage_troll",
            ReactiveMode::LoveTroll => "modes.usage_love_troll",
        };
        return reply_html(bot, msg, &get_text(key)).await;
    }

    match state.engine.add_reactive_targets(mode, msg.chat.id.0, &refs).await {
        Ok(users) => {
            let users = mentions(state, &users).await;
            let key = match mode {
                ReactiveMode::Troll => "modes.troll_set",
                ReactiveMode::LoveTroll => "modes.love_troll_set",
            };
            reply_html(bot, msg, &get_text_with(key, &[("users", users.as_str())])).await
        }
        Err(e) => report(bot, msg, e).await,
    }
}

pub async fn troll_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    add_reactive(&bot, &msg, &state, ReactiveMode::Troll, &args).await
}

pub async fn love_troll_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    add_reactive(&bot, &msg, &state, ReactiveMode::LoveTroll, &args).await
}

async fn set_pair(
    bot: &ThrottledBot,
    msg: &Message,
    state: &AppState,
    mode: PairMode,
    args: &str,
) -> anyhow::Result<()> {
    let refs = command_targets(msg, args);
    let [first, second, ..] = refs.as_slice() else {
        let key = match mode {
            PairMode::Funny => "modes.usage_funny",
            PairMode::LoveFunny => "modes.usage_love_funny",
        };
        return reply_html(bot, msg, &get_text(key)).await;
    };

    match state
        .engine
        .set_pair_targets(mode, msg.chat.id.0, first, second)
        .await
    {
        Ok((a, b)) => {
            let (a, b) = (state.names.mention(a).await, state.names.mention(b).await);
            let key = match mode {
                PairMode::Funny => "modes.funny_set",
                PairMode::LoveFunny => "modes.love_funny_set",
            };
            let text = get_text_with(key, &[("first", a.as_str()), ("second", b.as_str())]);
            reply_html(bot, msg, &text).await
        }
        Err(e) => report(bot, msg, e).await,
    }
}

pub async fn funny_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    set_pair(&bot, &msg, &state, PairMode::Funny, &args).await
}

pub async fn love_funny_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    set_pair(&bot, &msg, &state, PairMode::LoveFunny, &args).await
}

// --- Sweeps ---

pub async fn stoplove_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let key = if state.engine.stop_theme(msg.chat.id.0, Category::Affection) {
        "modes.love_stopped"
    } else {
        "modes.love_not_running"
    };
    reply_html(&bot, &msg, &get_text(key)).await
}

pub async fn stopall_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let stopped = state.engine.stop_all(msg.chat.id.0).to_string();
    let text = get_text_with("modes.all_stopped", &[("loops", stopped.as_str())]);
    reply_html(&bot, &msg, &text).await
}

// --- Hide & monitor ---

pub async fn hide_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let refs = command_targets(&msg, &args);
    if refs.is_empty() {
        return reply_html(&bot, &msg, &get_text("modes.usage_hide")).await;
    }
    match state.engine.hide(msg.chat.id.0, &refs).await {
        Ok(users) => {
            let count = users.len().to_string();
            reply_html(&bot, &msg, &get_text_with("modes.hidden", &[("count", count.as_str())]))
                .await
        }
        Err(e) => report(&bot, &msg, e).await,
    }
}

pub async fn unhide_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let refs = command_targets(&msg, &args);
    if refs.is_empty() {
        return reply_html(&bot, &msg, &get_text("modes.usage_unhide")).await;
    }
    let chat_id = msg.chat.id.0;
    if !state.engine.registry().has_hidden(chat_id) {
        return reply_html(&bot, &msg, &get_text("modes.nobody_hidden")).await;
    }
    match state.engine.unhide(chat_id, &refs).await {
        Ok(users) => {
            let count = users.len().to_string();
            reply_html(&bot, &msg, &get_text_with("modes.unhidden", &[("count", count.as_str())]))
                .await
        }
        Err(e) => report(&bot, &msg, e).await,
    }
}

pub async fn secret_monitor_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let key = if state.engine.toggle_monitor(msg.chat.id.0) {
        "modes.monitor_on"
    } else {
        "modes.monitor_off"
    };
    reply_html(&bot, &msg, &get_text(key)).await
}

pub async fn stop_secret_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let key = if state.engine.set_monitor(msg.chat.id.0, false) {
        "modes.monitor_stopped"
    } else {
        "modes.monitor_not_running"
    };
    reply_html(&bot, &msg, &get_text(key)).await
}

// --- Speed ---

pub async fn speed_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let args = args.trim();
    if args.is_empty() {
        let current = format!("{}", state.engine.tick_delay().as_secs_f64());
        let text = get_text_with("modes.speed_current", &[("secs", current.as_str())]);
        return reply_html(&bot, &msg, &text).await;
    }

    let Ok(seconds) = args.parse::<f64>() else {
        return reply_html(&bot, &msg, &get_text("modes.usage_speed")).await;
    };
    match state.engine.set_tick_delay(seconds) {
        Ok(delay) => {
            let secs = format!("{}", delay.as_secs_f64());
            reply_html(&bot, &msg, &get_text_with("modes.speed_set", &[("secs", secs.as_str())]))
                .await
        }
        Err(e) => report(&bot, &msg, e).await,
    }
}

pub async fn speed_on_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    state.settings.set_speed_for_admins(true);
    reply_html(&bot, &msg, &get_text("modes.speed_admins_on")).await
}

pub async fn speed_off_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    state.settings.set_speed_for_admins(false);
    reply_html(&bot, &msg, &get_text("modes.speed_admins_off")).await
}
