//! Repositories - one per collection, cache-first.

mod admin_repository;
mod chat_repository;
mod music_repository;
mod nickname_repository;
mod template_repository;
mod user_repository;

pub use admin_repository::AdminRepository;
pub use chat_repository::ChatRepository;
pub use music_repository::MusicRepository;
pub use nickname_repository::NicknameRepository;
pub use template_repository::TemplateRepository;
pub use user_repository::UserRepository;
