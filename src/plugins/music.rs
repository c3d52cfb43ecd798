//! Music catalog commands.
//!
//! Tracks are Telegram audio files referenced by `file_id`, grouped into
//! folders. Members browse and play; admins add and edit; owners manage
//! folders and delete.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode};
use tracing::info;

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::{Folder, Track};
use crate::i18n::{get_text, get_text_with};
use crate::utils::{html_escape, parse_id_list, reply_html, split_first};

const SEARCH_LIMIT: i64 = 10;

fn caption(track: &Track, prefix: &str) -> String {
    format!(
        "{} {} - {}",
        prefix,
        html_escape(&track.title),
        html_escape(&track.artist)
    )
}

/// The track after `current` in id order, wrapping to the first.
fn next_after(tracks: &[Track], current: Option<i64>) -> Option<&Track> {
    let current = current?;
    tracks
        .iter()
        .find(|t| t.id > current)
        .or_else(|| tracks.first())
}

async fn play(
    bot: &ThrottledBot,
    chat_id: ChatId,
    state: &AppState,
    track: &Track,
    prefix: &str,
) -> anyhow::Result<()> {
    bot.send_audio(chat_id, InputFile::file_id(track.file_id.clone()))
        .caption(caption(track, prefix))
        .parse_mode(ParseMode::Html)
        .await?;
    state.now_playing.insert(chat_id.0, track.id);
    Ok(())
}

fn folder_keyboard(
    folders: &[Folder],
    prefix: &str,
    with_description: bool,
) -> InlineKeyboardMarkup {
    let rows = folders.iter().map(|f| {
        let label = if with_description && !f.description.is_empty() {
            format!("{} - {}", f.name, f.description)
        } else if with_description {
            f.name.clone()
        } else {
            format!("{}: {}", f.id, f.name)
        };
        vec![InlineKeyboardButton::callback(label, format!("{}:{}", prefix, f.id))]
    });
    InlineKeyboardMarkup::new(rows)
}

fn track_lines(tracks: &[Track], with_folder: bool) -> String {
    tracks
        .iter()
        .map(|t| {
            let mut line = format!(
                "<code>{}</code> – {} by {}",
                t.id,
                html_escape(&t.title),
                html_escape(&t.artist)
            );
            if with_folder {
                line.push_str(&format!(" (Folder {})", t.folder_id));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// --- Member ---

pub async fn music_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let folders = state.music.folders().await?;
    if folders.is_empty() {
        return reply_html(&bot, &msg, &get_text("music.no_folders")).await;
    }
    bot.send_message(msg.chat.id, get_text("music.select_folder"))
        .reply_markup(folder_keyboard(&folders, "folder_member", true))
        .await?;
    Ok(())
}

pub async fn play_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let query = args.trim();
    if query.is_empty() {
        return reply_html(&bot, &msg, &get_text("music.usage_play")).await;
    }

    let track = match query.parse::<i64>() {
        Ok(id) => state.music.track(id).await?,
        Err(_) => state.music.find_first(query).await?,
    };
    match track {
        Some(track) => play(&bot, msg.chat.id, &state, &track, "🎵").await,
        None => reply_html(&bot, &msg, &get_text("music.not_found")).await,
    }
}

pub async fn random_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    match state.music.random_track().await? {
        Some(track) => play(&bot, msg.chat.id, &state, &track, "🎵").await,
        None => reply_html(&bot, &msg, &get_text("music.empty")).await,
    }
}

/// Next track after the one last played here; random when nothing was.
pub async fn next_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let current = state.now_playing.get(&msg.chat.id.0).map(|e| *e.value());
    let tracks = state.music.all_tracks().await?;

    let track = match next_after(&tracks, current) {
        Some(track) => Some(track.clone()),
        None => state.music.random_track().await?,
    };
    match track {
        Some(track) => play(&bot, msg.chat.id, &state, &track, "⏭️").await,
        None => reply_html(&bot, &msg, &get_text("music.empty")).await,
    }
}

pub async fn search_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let query = args.trim();
    if query.is_empty() {
        return reply_html(&bot, &msg, &get_text("music.usage_search")).await;
    }

    let results = state.music.search(query, SEARCH_LIMIT).await?;
    if results.is_empty() {
        return reply_html(&bot, &msg, &get_text("music.not_found")).await;
    }
    let text = format!(
        "🔍 <b>Search Results</b>\n{}\n\n{}",
        track_lines(&results, false),
        get_text("music.play_hint")
    );
    reply_html(&bot, &msg, &text).await
}

pub async fn music_info_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let Ok(id) = split_first(&args).0.parse::<i64>() else {
        return reply_html(&bot, &msg, &get_text("music.usage_music_info")).await;
    };
    let Some(track) = state.music.track(id).await? else {
        return reply_html(&bot, &msg, &get_text("music.not_found")).await;
    };

    let folder = state
        .music
        .folder(track.folder_id)
        .await?
        .map(|f| f.name)
        .unwrap_or_else(|| "-".to_string());
    let text = format!(
        "🎵 <b>Music Info</b>\nID: {}\nTitle: {}\nArtist: {}\nFolder: {}",
        track.id,
        html_escape(&track.title),
        html_escape(&track.artist),
        html_escape(&folder)
    );
    reply_html(&bot, &msg, &text).await
}

pub async fn folder_info_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let Ok(id) = split_first(&args).0.parse::<i64>() else {
        return reply_html(&bot, &msg, &get_text("music.usage_folder_info")).await;
    };
    let Some(folder) = state.music.folder(id).await? else {
        return reply_html(&bot, &msg, &get_text("music.folder_not_found")).await;
    };

    let description = if folder.description.is_empty() {
        "No description".to_string()
    } else {
        html_escape(&folder.description)
    };
    let text = format!(
        "📂 <b>Folder Info</b>\nName: {}\nDescription: {}\nMusic Count: {}",
        html_escape(&folder.name),
        description,
        state.music.count_in(id).await?
    );
    reply_html(&bot, &msg, &text).await
}

pub async fn music_list_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let tracks = state.music.all_tracks().await?;
    if tracks.is_empty() {
        return reply_html(&bot, &msg, &get_text("music.empty")).await;
    }
    let text = format!("🎶 <b>Music List</b>\n{}", track_lines(&tracks, true));
    reply_html(&bot, &msg, &text).await
}

// --- Admin ---

/// `/add_music folder_id [title] [artist]`, replying to an audio.
/// Missing title and artist fall back to the audio's own tags.
pub async fn add_music_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let Some(audio) = msg.reply_to_message().and_then(|r| r.audio()) else {
        return reply_html(&bot, &msg, &get_text("music.usage_add")).await;
    };
    let (folder, rest) = split_first(&args);
    let Ok(folder_id) = folder.parse::<i64>() else {
        return reply_html(&bot, &msg, &get_text("music.usage_add")).await;
    };
    if state.music.folder(folder_id).await?.is_none() {
        return reply_html(&bot, &msg, &get_text("music.folder_not_found")).await;
    }

    let (title, artist) = split_first(rest);
    let title = match title {
        "" => audio.title.clone().unwrap_or_else(|| "Unknown".to_string()),
        t => t.to_string(),
    };
    let artist = match artist.trim() {
        "" => audio
            .performer
            .clone()
            .unwrap_or_else(|| "Unknown Artist".to_string()),
        a => a.to_string(),
    };

    let added_by = msg.from.as_ref().map(|u| u.id.0).unwrap_or(0);
    let id = state
        .music
        .add_track(folder_id, &title, &artist, &audio.file.id, added_by)
        .await?;
    info!("Track {} added to folder {} by {}", id, folder_id, added_by);

    let (id, folder) = (id.to_string(), folder_id.to_string());
    let (title, artist) = (html_escape(&title), html_escape(&artist));
    let text = get_text_with(
        "music.added",
        &[
            ("id", id.as_str()),
            ("title", title.as_str()),
            ("artist", artist.as_str()),
            ("folder", folder.as_str()),
        ],
    );
    reply_html(&bot, &msg, &text).await
}

/// `/edit_music id title [artist]`
pub async fn edit_music_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let (id, rest) = split_first(&args);
    let (title, artist) = split_first(rest);
    let Ok(id) = id.parse::<i64>() else {
        return reply_html(&bot, &msg, &get_text("music.usage_edit")).await;
    };
    if title.is_empty() {
        return reply_html(&bot, &msg, &get_text("music.usage_edit")).await;
    }

    if !state.music.edit_track(id, title, artist.trim()).await? {
        return reply_html(&bot, &msg, &get_text("music.not_found")).await;
    }
    let id = id.to_string();
    reply_html(&bot, &msg, &get_text_with("music.edited", &[("id", id.as_str())])).await
}

pub async fn music_stats_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let (folders, tracks) = state.music.counts().await?;
    let text = format!(
        "📊 <b>Music Statistics</b>\n\n📂 Total Folders: {}\n🎵 Total Musics: {}",
        folders, tracks
    );
    reply_html(&bot, &msg, &text).await
}

// --- Owner ---

/// `/create_folder name [description]`
pub async fn create_folder_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let (name, description) = split_first(&args);
    if name.is_empty() {
        return reply_html(&bot, &msg, &get_text("music.usage_create_folder")).await;
    }

    let name_html = html_escape(name);
    match state.music.create_folder(name, description.trim()).await? {
        Some(id) => {
            let id = id.to_string();
            let text = get_text_with(
                "music.folder_created",
                &[("id", id.as_str()), ("name", name_html.as_str())],
            );
            reply_html(&bot, &msg, &text).await
        }
        None => reply_html(&bot, &msg, &get_text("music.folder_exists")).await,
    }
}

/// `/edit_folder id name [description]`
pub async fn edit_folder_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let (id, rest) = split_first(&args);
    let (name, description) = split_first(rest);
    let Ok(id) = id.parse::<i64>() else {
        return reply_html(&bot, &msg, &get_text("music.usage_edit_folder")).await;
    };
    if name.is_empty() {
        return reply_html(&bot, &msg, &get_text("music.usage_edit_folder")).await;
    }

    if !state.music.edit_folder(id, name, description.trim()).await? {
        return reply_html(&bot, &msg, &get_text("music.folder_not_found")).await;
    }
    let id = id.to_string();
    reply_html(&bot, &msg, &get_text_with("music.folder_edited", &[("id", id.as_str())])).await
}

pub async fn delete_folder_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let Ok(id) = split_first(&args).0.parse::<i64>() else {
        return reply_html(&bot, &msg, &get_text("music.usage_delete_folder")).await;
    };

    match state.music.delete_folder(id).await? {
        Some(tracks) => {
            let (id, tracks) = (id.to_string(), tracks.to_string());
            let text = get_text_with(
                "music.folder_deleted",
                &[("id", id.as_str()), ("tracks", tracks.as_str())],
            );
            reply_html(&bot, &msg, &text).await
        }
        None => reply_html(&bot, &msg, &get_text("music.folder_not_found")).await,
    }
}

pub async fn folder_list_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let folders = state.music.folders().await?;
    if folders.is_empty() {
        return reply_html(&bot, &msg, &get_text("music.no_folders")).await;
    }
    bot.send_message(msg.chat.id, get_text("music.folder_list"))
        .reply_markup(folder_keyboard(&folders, "folder_owner", false))
        .await?;
    Ok(())
}

pub async fn remove_music_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    args: String,
) -> anyhow::Result<()> {
    let ids = match parse_id_list(&args) {
        Ok(ids) => ids,
        Err(e) => {
            let error = html_escape(&e.to_string());
            let text = get_text_with("music.usage_remove", &[("error", error.as_str())]);
            return reply_html(&bot, &msg, &text).await;
        }
    };

    let removed = state.music.remove_tracks(&ids).await?.to_string();
    let ids = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(", ");
    let text = get_text_with(
        "music.removed",
        &[("count", removed.as_str()), ("ids", ids.as_str())],
    );
    reply_html(&bot, &msg, &text).await
}

pub async fn music_admin_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let (folders, tracks) = state.music.counts().await?;
    let (folders, tracks) = (folders.to_string(), tracks.to_string());
    let text = get_text_with(
        "music.admin_panel",
        &[("folders", folders.as_str()), ("tracks", tracks.as_str())],
    );
    reply_html(&bot, &msg, &text).await
}

// --- Callbacks ---

/// Music callbacks: `folder_member:<id>` opens a folder as buttons,
/// `folder_owner:<id>` lists it with ids, `play:<id>` plays a track.
pub async fn callback_handler(
    bot: ThrottledBot,
    q: CallbackQuery,
    state: AppState,
) -> anyhow::Result<()> {
    let Some((action, id)) = q.data.as_deref().and_then(|d| d.split_once(':')) else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };
    let (Ok(id), Some(message)) = (id.parse::<i64>(), q.message.as_ref()) else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };
    let chat_id = message.chat().id;

    match action {
        "folder_member" | "folder_owner" => {
            let tracks = state.music.tracks_in(id).await?;
            if tracks.is_empty() {
                bot.answer_callback_query(q.id)
                    .text(get_text("music.folder_empty"))
                    .await?;
                return Ok(());
            }

            if action == "folder_member" {
                let rows = tracks.iter().map(|t| {
                    vec![InlineKeyboardButton::callback(t.label(), format!("play:{}", t.id))]
                });
                bot.send_message(chat_id, get_text("music.tracks"))
                    .reply_markup(InlineKeyboardMarkup::new(rows))
                    .await?;
            } else {
                let text = format!(
                    "🎶 <b>Musics in this folder</b>\n{}",
                    track_lines(&tracks, false)
                );
                bot.send_message(chat_id, text)
                    .parse_mode(ParseMode::Html)
                    .await?;
            }
            bot.answer_callback_query(q.id).await?;
        }
        "play" => match state.music.track(id).await? {
            Some(track) => {
                play(&bot, chat_id, &state, &track, "🎵").await?;
                let title = track.title.clone();
                bot.answer_callback_query(q.id)
                    .text(get_text_with("music.playing", &[("title", title.as_str())]))
                    .await?;
            }
            None => {
                bot.answer_callback_query(q.id)
                    .text(get_text("music.not_found"))
                    .await?;
            }
        },
        _ => {
            bot.answer_callback_query(q.id).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: i64) -> Track {
        Track {
            id,
            title: format!("Song {}", id),
            artist: "Band".into(),
            file_id: format!("file-{}", id),
            folder_id: 1,
            added_by: None,
            added_at: 0,
        }
    }

    #[test]
    fn test_next_after_advances_and_wraps() {
        let tracks = vec![track(2), track(5), track(9)];
        assert_eq!(next_after(&tracks, Some(2)).map(|t| t.id), Some(5));
        assert_eq!(next_after(&tracks, Some(6)).map(|t| t.id), Some(9));
        assert_eq!(next_after(&tracks, Some(9)).map(|t| t.id), Some(2));
    }

    #[test]
    fn test_next_after_without_history() {
        let tracks = vec![track(1)];
        assert!(next_after(&tracks, None).is_none());
        assert!(next_after(&[], Some(1)).is_none());
    }

    #[test]
    fn test_caption_escapes() {
        let mut t = track(1);
        t.title = "<Hit>".into();
        assert_eq!(caption(&t, "🎵"), "🎵 &lt;Hit&gt; - Band");
    }

    #[test]
    fn test_folder_keyboard_callbacks() {
        let folders = vec![Folder {
            id: 3,
            name: "Pop".into(),
            description: String::new(),
        }];
        let keyboard = folder_keyboard(&folders, "folder_owner", false);
        assert_eq!(keyboard.inline_keyboard.len(), 1);
        assert_eq!(keyboard.inline_keyboard[0][0].text, "3: Pop");
    }
}
