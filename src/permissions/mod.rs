//! Permission module - bot-level roles and command access.
//!
//! Roles come from `OWNER_IDS` and the admin roster, not from Telegram chat
//! admin status. Guards run at the command router before any handler.

mod checker;

pub use checker::{Access, Permissions, Role};
