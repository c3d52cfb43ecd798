//! Role lookup with caching.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheConfig, CacheRegistry, TypedCache};
use crate::config::RuntimeSettings;
use crate::database::AdminRepository;

/// A user's role with the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Member,
    Admin,
    Owner,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Self::Owner => "👑 Owner",
            Self::Admin => "🛡️ Admin",
            Self::Member => "👤 Member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Access level a command requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Member,
    Admin,
    Owner,
    /// Owners, or admins while owners have opened speed control.
    Speed,
}

impl Access {
    /// Whether `role` passes this level.
    pub fn allows(self, role: Role, speed_for_admins: bool) -> bool {
        match self {
            Self::Member => true,
            Self::Admin => role >= Role::Admin,
            Self::Owner => role == Role::Owner,
            Self::Speed => role == Role::Owner || (speed_for_admins && role == Role::Admin),
        }
    }
}

/// Role checker. Owners are fixed at startup; admins come from the roster.
#[derive(Clone)]
pub struct Permissions {
    owner_ids: Arc<Vec<u64>>,
    admins: Arc<AdminRepository>,
    settings: Arc<RuntimeSettings>,
    roles: TypedCache<u64, Role>,
}

impl Permissions {
    pub fn new(
        owner_ids: Vec<u64>,
        admins: Arc<AdminRepository>,
        settings: Arc<RuntimeSettings>,
        cache: &CacheRegistry,
    ) -> Self {
        Self {
            owner_ids: Arc::new(owner_ids),
            admins,
            settings,
            roles: cache.get_or_create("user_roles", CacheConfig::per_user()),
        }
    }

    #[inline]
    pub fn is_owner(&self, user_id: u64) -> bool {
        self.owner_ids.contains(&user_id)
    }

    pub fn owner_ids(&self) -> &[u64] {
        &self.owner_ids
    }

    pub async fn role(&self, user_id: u64) -> anyhow::Result<Role> {
        if self.is_owner(user_id) {
            return Ok(Role::Owner);
        }
        if let Some(role) = self.roles.get(&user_id) {
            return Ok(role);
        }

        let ticket = self.roles.ticket();
        let role = if self.admins.is_active_admin(user_id).await? {
            Role::Admin
        } else {
            Role::Member
        };
        debug!("Role for {} resolved as {:?}", user_id, role);
        self.roles.fill(user_id, role, ticket);
        Ok(role)
    }

    pub async fn allows(&self, user_id: u64, access: Access) -> anyhow::Result<bool> {
        if access == Access::Member {
            return Ok(true);
        }
        let role = self.role(user_id).await?;
        Ok(access.allows(role, self.settings.speed_for_admins()))
    }

    /// Drop a cached role after a roster change.
    pub fn invalidate(&self, user_id: u64) {
        self.roles.invalidate(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_matrix() {
        assert!(Access::Member.allows(Role::Member, false));
        assert!(!Access::Admin.allows(Role::Member, false));
        assert!(Access::Admin.allows(Role::Admin, false));
        assert!(Access::Admin.allows(Role::Owner, false));
        assert!(!Access::Owner.allows(Role::Admin, true));
        assert!(Access::Owner.allows(Role::Owner, false));
    }

    #[test]
    fn test_speed_access_follows_switch() {
        assert!(Access::Speed.allows(Role::Owner, false));
        assert!(!Access::Speed.allows(Role::Admin, false));
        assert!(Access::Speed.allows(Role::Admin, true));
        assert!(!Access::Speed.allows(Role::Member, true));
    }
}
