//! Loopbot - Telegram group bot with per-chat broadcast loops.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration and runtime switches
//! - `database` - MongoDB repositories
//! - `cache` - Moka-backed caching layer
//! - `permissions` - Owner/admin roles and command guards
//! - `modes` - Loop manager, target registry and reactive stages
//! - `bot` - Dispatcher, Telegram messenger, polling/webhook runners
//! - `plugins` - Command handlers
//! - `events` - Non-command message handlers
//! - `i18n` - Response text catalog
//! - `utils` - Argument parsing and formatting helpers

mod bot;
mod cache;
mod config;
mod database;
mod error;
mod events;
mod i18n;
mod modes;
mod permissions;
mod plugins;
mod utils;

use std::sync::Arc;

use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cache::CacheRegistry;
use config::Config;
use database::Database;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("loopbot=info,teloxide=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting loopbot...");
    i18n::init();

    let config = Config::from_env()?;
    info!("Bot mode: {:?}", config.bot_mode);

    info!("Connecting to MongoDB...");
    let db = Arc::new(Database::connect(&config.mongodb_uri, &config.mongodb_database).await?);
    info!("Database connected");

    let cache = Arc::new(CacheRegistry::new());

    // Throttle keeps loop traffic inside Telegram's per-chat limits.
    let bot = Bot::new(&config.bot_token).throttle(Limits::default());
    let me = bot.get_me().await?;
    info!("Bot username: @{}", me.username());

    if config.owner_ids.is_empty() {
        info!("No owner IDs configured (OWNER_IDS is empty)");
    } else {
        info!("Bot owners: {:?}", config.owner_ids);
    }

    let state = bot::AppState::new(
        bot.clone(),
        db,
        cache,
        &config,
        me.username().to_string(),
    );
    let engine = state.engine.clone();
    let dispatcher = bot::build_dispatcher(bot.clone(), state);

    bot::run(&config, dispatcher, bot).await?;

    engine.emergency_stop_all();
    info!("Shut down cleanly");
    Ok(())
}
