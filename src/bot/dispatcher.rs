//! Message dispatcher setup.
//!
//! Builds the shared state and the dptree schema: commands first, then the
//! group event handlers, plus inline keyboard callbacks.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use teloxide::adaptors::Throttle;
use teloxide::dispatching::{DefaultKey, UpdateHandler};
use teloxide::prelude::*;

use super::messenger::TelegramMessenger;
use crate::cache::CacheRegistry;
use crate::config::{Config, RuntimeSettings};
use crate::database::{
    AdminRepository, ChatRepository, Database, MusicRepository, NicknameRepository,
    TemplateRepository, UserRepository,
};
use crate::events;
use crate::modes::{Messenger, ModeEngine, NameResolver, TargetRegistry};
use crate::permissions::Permissions;
use crate::plugins;

/// Bot type with Throttle adaptor for automatic rate limiting.
pub type ThrottledBot = Throttle<Bot>;

pub type BotDispatcher = Dispatcher<ThrottledBot, anyhow::Error, DefaultKey>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheRegistry>,

    /// Role checker (owners, roster admins).
    pub permissions: Permissions,

    pub admins: Arc<AdminRepository>,
    pub templates: Arc<TemplateRepository>,
    pub nicknames: Arc<NicknameRepository>,
    pub users: Arc<UserRepository>,
    pub chats: Arc<ChatRepository>,
    pub music: Arc<MusicRepository>,

    /// Loops, target tables and the reactive stages.
    pub engine: Arc<ModeEngine>,

    /// Mention rendering with nickname overrides.
    pub names: NameResolver,

    /// Switches owners can flip at runtime.
    pub settings: Arc<RuntimeSettings>,

    /// Last track played per chat, for `/next`.
    pub now_playing: Arc<DashMap<i64, i64>>,

    pub started_at: Instant,

    /// Bot username (without @).
    pub bot_username: String,
}

impl AppState {
    pub fn new(
        bot: ThrottledBot,
        db: Arc<Database>,
        cache: Arc<CacheRegistry>,
        config: &Config,
        bot_username: String,
    ) -> Self {
        let settings = Arc::new(RuntimeSettings::new());

        let admins = Arc::new(AdminRepository::new(&db, &cache));
        let templates = Arc::new(TemplateRepository::new(db.clone(), &cache));
        let nicknames = Arc::new(NicknameRepository::new(&db, &cache));
        let users = Arc::new(UserRepository::new(&db, &cache));
        let chats = Arc::new(ChatRepository::new(&db, &cache));
        let music = Arc::new(MusicRepository::new(db.clone(), &cache));

        let permissions = Permissions::new(
            config.owner_ids.clone(),
            admins.clone(),
            settings.clone(),
            &cache,
        );

        let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(bot, users.clone()));
        let names = NameResolver::new(nicknames.clone(), messenger.clone());
        let engine = Arc::new(ModeEngine::new(
            Arc::new(TargetRegistry::new()),
            templates.clone(),
            names.clone(),
            messenger,
            config.owner_ids.clone(),
            config.tick_delay,
        ));

        Self {
            cache,
            permissions,
            admins,
            templates,
            nicknames,
            users,
            chats,
            music,
            engine,
            names,
            settings,
            now_playing: Arc::new(DashMap::new()),
            started_at: Instant::now(),
            bot_username,
        }
    }

    pub fn is_owner(&self, user_id: u64) -> bool {
        self.permissions.is_owner(user_id)
    }
}

/// Build the dispatcher with all handlers.
pub fn build_dispatcher(bot: ThrottledBot, state: AppState) -> BotDispatcher {
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
}

fn schema() -> UpdateHandler<anyhow::Error> {
    let message_handler = Update::filter_message()
        .inspect_async(track_sender)
        .branch(plugins::command_handler())
        .branch(events::message_event_handler());

    dptree::entry()
        .branch(message_handler)
        .branch(plugins::callback_handler())
}

/// Record the sender and the chat (runs before all handlers).
async fn track_sender(bot: ThrottledBot, msg: Message, state: AppState) {
    if let Some(user) = msg.from.as_ref() {
        state.users.clone().track_background(user.clone());
    }
    events::track_chat(&bot, &msg, &state);
}
