//! Reply helpers shared by command handlers.

use teloxide::prelude::*;
use teloxide::types::{ParseMode, ReplyParameters};

use crate::bot::ThrottledBot;

/// Telegram rejects messages longer than 4096 characters.
const MAX_MESSAGE_CHARS: usize = 4000;

/// Reply to a command with HTML text. Long text is split on line breaks
/// and only the first part is threaded as a reply.
pub async fn reply_html(bot: &ThrottledBot, msg: &Message, text: &str) -> anyhow::Result<()> {
    for (i, part) in chunk_lines(text, MAX_MESSAGE_CHARS).into_iter().enumerate() {
        let request = bot.send_message(msg.chat.id, part).parse_mode(ParseMode::Html);
        if i == 0 {
            request.reply_parameters(ReplyParameters::new(msg.id)).await?;
        } else {
            request.await?;
        }
    }
    Ok(())
}

/// Split text into parts of at most `limit` characters, breaking between
/// lines where possible.
pub fn chunk_lines(text: &str, limit: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > limit && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > limit {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                parts.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_part() {
        assert_eq!(chunk_lines("a\nb", 10), vec!["a\nb".to_string()]);
    }

    #[test]
    fn test_splits_between_lines() {
        let parts = chunk_lines("aaaa\nbbbb\ncccc", 10);
        assert_eq!(parts, vec!["aaaa\nbbbb\n".to_string(), "cccc".to_string()]);
    }

    #[test]
    fn test_overlong_line_is_cut() {
        let parts = chunk_lines("abcdefgh", 3);
        assert_eq!(parts, vec!["abc", "def", "gh"]);
    }
}
