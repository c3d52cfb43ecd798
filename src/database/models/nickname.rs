use serde::{Deserialize, Serialize};

/// Display-name override for a user.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Nickname {
    pub user_id: u64,
    pub nickname: String,
    pub updated_at: i64,
}

impl Nickname {
    pub fn new(user_id: u64, nickname: &str) -> Self {
        Self {
            user_id,
            nickname: nickname.to_string(),
            updated_at: chrono::Utc::now().timestamp(),
        }
    }
}
