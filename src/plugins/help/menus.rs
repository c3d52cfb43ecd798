//! Help menu texts and keyboards.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::permissions::Access;

/// A help page reachable through `help:<topic>` callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Menu {
    Main,
    Admin,
    Topics,
    Love,
    Song,
    Owner,
}

impl Menu {
    pub fn parse(topic: &str) -> Option<Self> {
        match topic {
            "main" | "back" => Some(Self::Main),
            "admin" => Some(Self::Admin),
            "topics" => Some(Self::Topics),
            "love" => Some(Self::Love),
            "song" => Some(Self::Song),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }

    pub fn access(self) -> Access {
        match self {
            Self::Main => Access::Member,
            Self::Owner => Access::Owner,
            _ => Access::Admin,
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            Self::Main => MAIN,
            Self::Admin => ADMIN,
            Self::Topics => TOPICS,
            Self::Love => LOVE,
            Self::Song => SONG,
            Self::Owner => OWNER,
        }
    }

    pub fn keyboard(self) -> InlineKeyboardMarkup {
        match self {
            Self::Main => InlineKeyboardMarkup::new(vec![
                vec![
                    InlineKeyboardButton::callback("🛡️ Admin", "help:admin"),
                    InlineKeyboardButton::callback("👑 Owner", "help:owner"),
                ],
                vec![InlineKeyboardButton::callback("🎵 Music", "help:song")],
            ]),
            Self::Admin => InlineKeyboardMarkup::new(vec![
                vec![
                    InlineKeyboardButton::callback("😈 Fight", "help:topics"),
                    InlineKeyboardButton::callback("💞 Love", "help:love"),
                ],
                vec![
                    InlineKeyboardButton::callback("🎵 Music", "help:song"),
                    InlineKeyboardButton::callback("⬅️ Back", "help:main"),
                ],
            ]),
            _ => InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
                "⬅️ Back",
                "help:main",
            )]]),
        }
    }
}

/// Menu text followed by the viewer's role.
pub fn with_status(menu: Menu, status: &str) -> String {
    format!("{}\n\n<b>Your Status:</b> {}", menu.text(), status)
}

const MAIN: &str = "📋 <b>Member Commands</b>
/start - Start the bot
/help - This menu
/time - Current time
/info - Your details (or reply)
/id - User id (or reply)
/music - Browse the music library
/random - Play a random track

🔏 Admin commands - /admincmd
🔑 Owner commands - /ownercmd";

const ADMIN: &str = "🛡️ <b>Admin Commands</b>

😈 <b>Fight</b>
/topics - Fight, troll, funny and hide commands

💞 <b>Love</b>
/lovecmd - Love commands

🎵 <b>Music</b>
/song - Music commands

📊 <b>Status</b>
/preview - Bot status
/adminlist - Admin roster
/gp_list - Tracked chats";

const TOPICS: &str = "😈 <b>Fight Commands</b>
/id - User id (reply)
/fight id... - Start the fight loop
/stop fight - Stop the fight loop
/stopall - Stop fight, love, troll, funny and hide in this chat
/add_message text - Add a fight template (or reply)
/troll id... - Reply to every message from a user
/funny id1 id2 - Set two users against each other
/name id nickname - Give a user a nickname
/remove_name id - Remove a nickname
/hide id... - Delete every message from a user
/unhide id... - Stop deleting
/secret_monitor - Toggle forwarding this chat to the owners
/stop_secret - Stop forwarding
/speed [seconds] - Show or set the loop delay";

const LOVE: &str = "💞 <b>Love Commands</b>

💕 <b>Templates</b> (owner)
/add_love_message text - Add a love template (or reply)
/list_love_messages - List love templates
/remove_love_message id,... - Remove love templates

💖 <b>Modes</b>
/love id... - Start the love loop
/love_troll id... - Sweet replies to every message
/love_funny id1 id2 - Matchmake two users
/stoplove - Stop every love mode in this chat";

const SONG: &str = "🎵 <b>Music Commands</b>

👥 <b>Members</b>
/music - Browse folders
/play id|title - Play a track
/random - Play a random track
/next - Play the next track
/search query - Search by title or artist
/music_info id - Track details
/folder_info id - Folder details
/music_list - Every track

🛡️ <b>Admins</b>
/add_music folder_id [title] [artist] - Add a track (reply to audio)
/edit_music id title [artist] - Edit a track
/music_stats - Statistics

👑 <b>Owner</b>
/create_folder name [description] - Create a folder
/edit_folder id name [description] - Edit a folder
/delete_folder id - Delete a folder and its tracks
/folder_list - Manage folders
/remove_music id,... - Remove tracks
/music_admin - Music admin panel";

const OWNER: &str = "👑 <b>Owner Commands</b>

🛡️ <b>Admins</b>
/add_admin id - Add an admin
/remove_admin id - Remove an admin
/show_adminId - Admin ids with mentions
/ban_admin id - Ban an admin
/unban_admin id - Unban an admin
/remove_adminlist - Banned admins
/admin_limit id n - Set a daily limit
/admin_unlimit id - Remove the limit

📊 <b>System</b>
/dashboard - Dashboard
/shutdown - Stop everything and exit
/upload - Copy the replied message to every chat
/broadcast text - Message every known user (or reply)

📝 <b>Templates</b>
/list_message - Fight templates
/remove_message id,... - Remove fight templates

⚙️ <b>Settings</b>
/speed_on - Allow admins to use /speed
/speed_off - Owners only for /speed
/welcome - Toggle welcome messages
/welcome_mode - Welcome status
/welcome_text text - Set the welcome text ({name}, {username})";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_topics_round_trip() {
        for (topic, menu) in [
            ("main", Menu::Main),
            ("admin", Menu::Admin),
            ("topics", Menu::Topics),
            ("love", Menu::Love),
            ("song", Menu::Song),
            ("owner", Menu::Owner),
        ] {
            assert_eq!(Menu::parse(topic), Some(menu));
        }
        assert_eq!(Menu::parse("nope"), None);
    }

    #[test]
    fn test_menu_access() {
        assert_eq!(Menu::Main.access(), Access::Member);
        assert_eq!(Menu::Love.access(), Access::Admin);
        assert_eq!(Menu::Owner.access(), Access::Owner);
    }
}
