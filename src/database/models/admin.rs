//! Bot admin roster entry.

use serde::{Deserialize, Serialize};

/// One roster member. Banned members keep their entry but lose admin rights.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRecord {
    pub user_id: u64,
    #[serde(default)]
    pub added_by: Option<u64>,
    pub added_at: i64,

    #[serde(default)]
    pub banned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banned_at: Option<i64>,

    /// Daily command allowance shown in the roster. `None` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_limit: Option<i64>,
}

impl AdminRecord {
    pub fn new(user_id: u64, added_by: Option<u64>) -> Self {
        Self {
            user_id,
            added_by,
            added_at: chrono::Utc::now().timestamp(),
            banned: false,
            banned_at: None,
            daily_limit: None,
        }
    }

    /// In the roster and not banned.
    pub fn is_active(&self) -> bool {
        !self.banned
    }
}
