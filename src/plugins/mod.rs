//! Plugin system for command handlers.
//!
//! Add new commands by:
//! 1. Adding a variant to `Command` and its level to `Command::access`
//! 2. Writing the handler in the matching plugin file
//! 3. Adding a `case!` branch to `command_handler()`

pub mod admin;
pub mod help;
pub mod info;
pub mod modes;
pub mod music;
pub mod nickname;
pub mod start;
pub mod system;
pub mod templates;
pub mod welcome;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::ReplyParameters;
use teloxide::utils::command::BotCommands;
use tracing::{debug, warn};

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::i18n::get_text;
use crate::permissions::Access;

/// All bot commands.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "snake_case", description = "Available commands:")]
pub enum Command {
    // Member
    #[command(description = "Start the bot")]
    Start(String),
    #[command(description = "Help menu")]
    Help,
    #[command(description = "Your or the replied user's id")]
    Id,
    #[command(description = "User details with role")]
    Info,
    #[command(description = "Current Myanmar time")]
    Time,
    #[command(description = "Browse the music library")]
    Music,
    #[command(description = "Play a track by id or title")]
    Play(String),
    #[command(description = "Play a random track")]
    Random,
    #[command(description = "Play the next track")]
    Next,
    #[command(description = "Search tracks")]
    Search(String),
    #[command(description = "Track details")]
    MusicInfo(String),
    #[command(description = "Folder details")]
    FolderInfo(String),
    #[command(description = "List every track")]
    MusicList,

    // Admin
    #[command(description = "Admin command menu")]
    Admincmd,
    #[command(description = "Fight command menu")]
    Topics,
    #[command(description = "Love command menu")]
    Lovecmd,
    #[command(description = "Music command menu")]
    Song,
    #[command(description = "Mention the replied user")]
    Use,
    #[command(description = "List bot admins")]
    Adminlist,
    #[command(description = "Add a fight template")]
    AddMessage(String),
    #[command(description = "Set a nickname")]
    Name(String),
    #[command(description = "Remove a nickname")]
    RemoveName(String),
    #[command(description = "Start the fight loop")]
    Fight(String),
    #[command(description = "Start the love loop")]
    Love(String),
    #[command(description = "Stop the fight or love loop")]
    Stop(String),
    #[command(description = "Troll replies")]
    Troll(String),
    #[command(description = "Love troll replies")]
    LoveTroll(String),
    #[command(description = "Funny pair")]
    Funny(String),
    #[command(description = "Love funny pair")]
    LoveFunny(String),
    #[command(description = "Stop every love mode")]
    Stoplove,
    #[command(description = "Stop every mode in this chat")]
    Stopall,
    #[command(description = "Delete messages from users")]
    Hide(String),
    #[command(description = "Stop deleting messages from users")]
    Unhide(String),
    #[command(description = "Toggle secret monitoring")]
    SecretMonitor,
    #[command(description = "Stop secret monitoring")]
    StopSecret,
    #[command(description = "Add a track (reply to audio)")]
    AddMusic(String),
    #[command(description = "Edit a track")]
    EditMusic(String),
    #[command(description = "Music statistics")]
    MusicStats,
    #[command(description = "Bot status preview")]
    Preview,
    #[command(description = "Tracked chats")]
    GpList,

    // Owner or speed-enabled admin
    #[command(description = "Show or set the loop delay")]
    Speed(String),

    // Owner
    #[command(description = "Owner command menu")]
    Ownercmd,
    #[command(description = "Add an admin")]
    AddAdmin(String),
    #[command(description = "Remove an admin")]
    RemoveAdmin(String),
    #[command(rename = "show_adminId", description = "Admin ids with mentions")]
    ShowAdminId,
    #[command(description = "Ban an admin")]
    BanAdmin(String),
    #[command(description = "Unban an admin")]
    UnbanAdmin(String),
    #[command(description = "Banned admins")]
    RemoveAdminlist,
    #[command(description = "Set an admin's daily limit")]
    AdminLimit(String),
    #[command(description = "Remove an admin's daily limit")]
    AdminUnlimit(String),
    #[command(description = "List fight templates")]
    ListMessage,
    #[command(description = "Remove fight templates")]
    RemoveMessage(String),
    #[command(description = "Add a love template")]
    AddLoveMessage(String),
    #[command(description = "List love templates")]
    ListLoveMessages,
    #[command(description = "Remove love templates")]
    RemoveLoveMessage(String),
    #[command(description = "Create a music folder")]
    CreateFolder(String),
    #[command(description = "Edit a music folder")]
    EditFolder(String),
    #[command(description = "Delete a folder and its tracks")]
    DeleteFolder(String),
    #[command(description = "Manage folders")]
    FolderList,
    #[command(description = "Remove tracks")]
    RemoveMusic(String),
    #[command(description = "Music admin panel")]
    MusicAdmin,
    #[command(description = "Owner dashboard")]
    Dashboard,
    #[command(description = "Stop everything and exit")]
    Shutdown,
    #[command(description = "Copy the replied message to every chat")]
    Upload,
    #[command(description = "Message every known user")]
    Broadcast(String),
    #[command(description = "Allow admins to change speed")]
    SpeedOn,
    #[command(description = "Disallow admins to change speed")]
    SpeedOff,
    #[command(description = "Toggle welcome messages")]
    Welcome,
    #[command(description = "Welcome status")]
    WelcomeMode,
    #[command(description = "Set the welcome text")]
    WelcomeText(String),
}

impl Command {
    /// Access level required to run the command.
    pub fn access(&self) -> Access {
        use Command::*;
        match self {
            Start(_) | Help | Id | Info | Time | Music | Play(_) | Random | Next | Search(_)
            | MusicInfo(_) | FolderInfo(_) | MusicList => Access::Member,

            Admincmd | Topics | Lovecmd | Song | Use | Adminlist | AddMessage(_) | Name(_)
            | RemoveName(_) | Fight(_) | Love(_) | Stop(_) | Troll(_) | LoveTroll(_)
            | Funny(_) | LoveFunny(_) | Stoplove | Stopall | Hide(_) | Unhide(_)
            | SecretMonitor | StopSecret | AddMusic(_) | EditMusic(_) | MusicStats | Preview
            | GpList => Access::Admin,

            Speed(_) => Access::Speed,

            _ => Access::Owner,
        }
    }
}

/// Build the combined command handler.
pub fn command_handler() -> UpdateHandler<anyhow::Error> {
    use dptree::case;

    teloxide::filter_command::<Command, _>()
        .branch(dptree::filter_async(is_denied).endpoint(deny))
        // Member
        .branch(case![Command::Start(args)].endpoint(start::start_command))
        .branch(case![Command::Help].endpoint(help::help_command))
        .branch(case![Command::Id].endpoint(info::id_command))
        .branch(case![Command::Info].endpoint(info::info_command))
        .branch(case![Command::Time].endpoint(info::time_command))
        .branch(case![Command::Music].endpoint(music::music_command))
        .branch(case![Command::Play(args)].endpoint(music::play_command))
        .branch(case![Command::Random].endpoint(music::random_command))
        .branch(case![Command::Next].endpoint(music::next_command))
        .branch(case![Command::Search(args)].endpoint(music::search_command))
        .branch(case![Command::MusicInfo(args)].endpoint(music::music_info_command))
        .branch(case![Command::FolderInfo(args)].endpoint(music::folder_info_command))
        .branch(case![Command::MusicList].endpoint(music::music_list_command))
        // Menus
        .branch(case![Command::Admincmd].endpoint(help::admin_menu_command))
        .branch(case![Command::Topics].endpoint(help::topics_command))
        .branch(case![Command::Lovecmd].endpoint(help::love_menu_command))
        .branch(case![Command::Song].endpoint(help::song_command))
        .branch(case![Command::Ownercmd].endpoint(help::owner_menu_command))
        .branch(case![Command::Use].endpoint(info::use_command))
        // Admin roster
        .branch(case![Command::Adminlist].endpoint(admin::adminlist_command))
        .branch(case![Command::AddAdmin(args)].endpoint(admin::add_admin_command))
        .branch(case![Command::RemoveAdmin(args)].endpoint(admin::remove_admin_command))
        .branch(case![Command::ShowAdminId].endpoint(admin::show_admin_id_command))
        .branch(case![Command::BanAdmin(args)].endpoint(admin::ban_admin_command))
        .branch(case![Command::UnbanAdmin(args)].endpoint(admin::unban_admin_command))
        .branch(case![Command::RemoveAdminlist].endpoint(admin::banned_list_command))
        .branch(case![Command::AdminLimit(args)].endpoint(admin::admin_limit_command))
        .branch(case![Command::AdminUnlimit(args)].endpoint(admin::admin_unlimit_command))
        // Templates
        .branch(case![Command::AddMessage(args)].endpoint(templates::add_message_command))
        .branch(case![Command::ListMessage].endpoint(templates::list_message_command))
        .branch(case![Command::RemoveMessage(args)].endpoint(templates::remove_message_command))
        .branch(case![Command::AddLoveMessage(args)].endpoint(templates::add_love_message_command))
        .branch(case![Command::ListLoveMessages].endpoint(templates::list_love_messages_command))
        .branch(
            case![Command::RemoveLoveMessage(args)]
                .endpoint(templates::remove_love_message_command),
        )
        // Nicknames
        .branch(case![Command::Name(args)].endpoint(nickname::name_command))
        .branch(case![Command::RemoveName(args)].endpoint(nickname::remove_name_command))
        // Modes
        .branch(case![Command::Fight(args)].endpoint(modes::fight_command))
        .branch(case![Command::Love(args)].endpoint(modes::love_command))
        .branch(case![Command::Stop(args)].endpoint(modes::stop_command))
        .branch(case![Command::Troll(args)].endpoint(modes::troll_command))
        .branch(case![Command::LoveTroll(args)].endpoint(modes::love_troll_command))
        .branch(case![Command::Funny(args)].endpoint(modes::funny_command))
        .branch(case![Command::LoveFunny(args)].endpoint(modes::love_funny_command))
        .branch(case![Command::Stoplove].endpoint(modes::stoplove_command))
        .branch(case![Command::Stopall].endpoint(modes::stopall_command))
        .branch(case![Command::Hide(args)].endpoint(modes::hide_command))
        .branch(case![Command::Unhide(args)].endpoint(modes::unhide_command))
        .branch(case![Command::SecretMonitor].endpoint(modes::secret_monitor_command))
        .branch(case![Command::StopSecret].endpoint(modes::stop_secret_command))
        .branch(case![Command::Speed(args)].endpoint(modes::speed_command))
        .branch(case![Command::SpeedOn].endpoint(modes::speed_on_command))
        .branch(case![Command::SpeedOff].endpoint(modes::speed_off_command))
        // Music management
        .branch(case![Command::AddMusic(args)].endpoint(music::add_music_command))
        .branch(case![Command::EditMusic(args)].endpoint(music::edit_music_command))
        .branch(case![Command::MusicStats].endpoint(music::music_stats_command))
        .branch(case![Command::CreateFolder(args)].endpoint(music::create_folder_command))
        .branch(case![Command::EditFolder(args)].endpoint(music::edit_folder_command))
        .branch(case![Command::DeleteFolder(args)].endpoint(music::delete_folder_command))
        .branch(case![Command::FolderList].endpoint(music::folder_list_command))
        .branch(case![Command::RemoveMusic(args)].endpoint(music::remove_music_command))
        .branch(case![Command::MusicAdmin].endpoint(music::music_admin_command))
        // System
        .branch(case![Command::Preview].endpoint(system::preview_command))
        .branch(case![Command::GpList].endpoint(system::gp_list_command))
        .branch(case![Command::Dashboard].endpoint(system::dashboard_command))
        .branch(case![Command::Shutdown].endpoint(system::shutdown_command))
        .branch(case![Command::Upload].endpoint(system::upload_command))
        .branch(case![Command::Broadcast(args)].endpoint(system::broadcast_command))
        // Welcome
        .branch(case![Command::Welcome].endpoint(welcome::welcome_command))
        .branch(case![Command::WelcomeMode].endpoint(welcome::welcome_mode_command))
        .branch(case![Command::WelcomeText(args)].endpoint(welcome::welcome_text_command))
}

/// Guard run before every command. A failed role lookup denies.
async fn is_denied(msg: Message, cmd: Command, state: AppState) -> bool {
    let access = cmd.access();
    if access == Access::Member {
        return false;
    }
    let Some(user) = msg.from.as_ref() else {
        return true;
    };
    match state.permissions.allows(user.id.0, access).await {
        Ok(allowed) => {
            if !allowed {
                debug!("Denied {:?} for user {}", cmd, user.id);
            }
            !allowed
        }
        Err(e) => {
            warn!("Role lookup failed for {}: {}", user.id, e);
            true
        }
    }
}

async fn deny(bot: ThrottledBot, msg: Message, cmd: Command) -> anyhow::Result<()> {
    let key = match cmd.access() {
        Access::Owner => "common.owner_only",
        _ => "common.no_permission",
    };
    bot.send_message(msg.chat.id, get_text(key))
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}

fn has_prefix(q: &CallbackQuery, prefix: &str) -> bool {
    q.data.as_deref().is_some_and(|d| d.starts_with(prefix))
}

/// Build the callback query handler.
pub fn callback_handler() -> UpdateHandler<anyhow::Error> {
    Update::filter_callback_query()
        .branch(
            dptree::filter(|q: CallbackQuery| has_prefix(&q, "help:"))
                .endpoint(help::callback_handler),
        )
        .branch(
            dptree::filter(|q: CallbackQuery| has_prefix(&q, "dash_"))
                .endpoint(system::dashboard_callback),
        )
        .branch(dptree::endpoint(music::callback_handler))
}
