//! Utility functions.
//!
//! Collection of helper functions used across the bot.

pub mod args;
pub mod reply;
pub mod target;

pub use args::{parse_id_list, split_first};
pub use reply::reply_html;
pub use target::{command_targets, reply_target_id};

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<b>Tom & Jerry</b>"), "&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;");
        assert_eq!(html_escape("plain"), "plain");
    }
}
