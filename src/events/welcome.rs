//! Welcome event handler.
//!
//! Greets new members from the `new_chat_members` service message, which the
//! bot receives without admin rights.

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, User};
use tracing::{debug, info};

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::modes::mention;
use crate::utils::html_escape;

/// Returns the handler for join messages.
pub fn handler() -> UpdateHandler<anyhow::Error> {
    dptree::filter(|msg: Message| msg.new_chat_members().is_some()).endpoint(welcome_handler)
}

/// Members worth greeting: humans only.
fn greetable(members: &[User]) -> impl Iterator<Item = &User> {
    members.iter().filter(|user| !user.is_bot)
}

/// Fill the welcome template for one member. The template is escaped first;
/// the substituted mention is HTML.
pub fn render(template: &str, user: &User) -> String {
    let name = mention(user.id.0, &user.first_name);
    let username = user
        .username
        .as_ref()
        .map(|u| format!("@{}", u))
        .unwrap_or_else(|| html_escape(&user.first_name));
    html_escape(template)
        .replace("{name}", &name)
        .replace("{username}", &username)
}

async fn welcome_handler(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    if !state.settings.welcome_enabled() {
        return Ok(());
    }
    let Some(members) = msg.new_chat_members() else {
        return Ok(());
    };

    let template = state.settings.welcome_text();
    for user in greetable(members) {
        debug!("New member {} joined chat {}", user.id, msg.chat.id);
        bot.send_message(msg.chat.id, render(&template, user))
            .parse_mode(ParseMode::Html)
            .await?;
        info!("Sent welcome message to {} in chat {}", user.id, msg.chat.id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::UserId;

    fn user(id: u64, name: &str, username: Option<&str>, is_bot: bool) -> User {
        User {
            id: UserId(id),
            is_bot,
            first_name: name.to_string(),
            last_name: None,
            username: username.map(str::to_string),
            language_code: None,
            is_premium: false,
            added_to_attachment_menu: false,
        }
    }

    #[test]
    fn test_render_fills_placeholders() {
        let text = render("Hi {name} ({username}) & co", &user(7, "Ann", Some("ann"), false));
        assert_eq!(text, "Hi <a href=\"tg://user?id=7\">Ann</a> (@ann) &amp; co");
    }

    #[test]
    fn test_render_without_username_uses_name() {
        let text = render("{username}", &user(7, "<Bob>", None, false));
        assert_eq!(text, "&lt;Bob&gt;");
    }

    #[test]
    fn test_bots_are_not_greeted() {
        let members = vec![user(1, "A", None, false), user(2, "Bot", None, true)];
        let ids: Vec<u64> = greetable(&members).map(|u| u.id.0).collect();
        assert_eq!(ids, vec![1]);
    }
}
