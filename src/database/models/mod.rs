//! Database models.

pub mod admin;
pub mod chat;
pub mod music;
pub mod nickname;
pub mod template;
pub mod user;

pub use admin::AdminRecord;
pub use chat::ChatRecord;
pub use music::{Folder, Track};
pub use nickname::Nickname;
pub use template::TemplateDoc;
pub use user::KnownUser;
