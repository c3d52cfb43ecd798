//! Admin roster repository.
//!
//! The whole roster is small and read on every guarded command, so it is
//! cached as one list and dropped on every write.

use anyhow::Result;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson};
use mongodb::Collection;
use tracing::info;

use crate::cache::{CacheConfig, CacheRegistry, TypedCache};
use crate::database::models::AdminRecord;
use crate::database::Database;

pub struct AdminRepository {
    collection: Collection<AdminRecord>,
    roster: TypedCache<(), Vec<AdminRecord>>,
}

impl AdminRepository {
    pub fn new(db: &Database, cache: &CacheRegistry) -> Self {
        Self {
            collection: db.collection("admins"),
            roster: cache.get_or_create("admin_roster", CacheConfig::roster()),
        }
    }

    /// Full roster, banned members included, ordered by when they were added.
    pub async fn all(&self) -> Result<Vec<AdminRecord>> {
        if let Some(roster) = self.roster.get(&()) {
            return Ok(roster);
        }

        let ticket = self.roster.ticket();
        let roster: Vec<AdminRecord> = self
            .collection
            .find(doc! {})
            .sort(doc! { "added_at": 1 })
            .await?
            .try_collect()
            .await?;

        self.roster.fill((), roster.clone(), ticket);
        Ok(roster)
    }

    pub async fn get(&self, user_id: u64) -> Result<Option<AdminRecord>> {
        Ok(self.all().await?.into_iter().find(|a| a.user_id == user_id))
    }

    /// In the roster and not banned.
    pub async fn is_active_admin(&self, user_id: u64) -> Result<bool> {
        Ok(self.get(user_id).await?.is_some_and(|a| a.is_active()))
    }

    pub async fn banned(&self) -> Result<Vec<AdminRecord>> {
        Ok(self.all().await?.into_iter().filter(|a| a.banned).collect())
    }

    /// Add to the roster. Returns `false` if already present.
    pub async fn add(&self, user_id: u64, added_by: u64) -> Result<bool> {
        if self.get(user_id).await?.is_some() {
            return Ok(false);
        }
        self.collection
            .insert_one(AdminRecord::new(user_id, Some(added_by)))
            .await?;
        self.roster.invalidate(&());
        info!("Admin {} added by {}", user_id, added_by);
        Ok(true)
    }

    /// Remove from the roster. Returns whether an entry existed.
    pub async fn remove(&self, user_id: u64) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! { "user_id": user_id as i64 })
            .await?;
        self.roster.invalidate(&());
        Ok(result.deleted_count > 0)
    }

    /// Ban or unban a roster member. Returns `false` if not in the roster.
    pub async fn set_banned(&self, user_id: u64, banned: bool) -> Result<bool> {
        let banned_at = if banned {
            Bson::Int64(chrono::Utc::now().timestamp())
        } else {
            Bson::Null
        };
        let result = self
            .collection
            .update_one(
                doc! { "user_id": user_id as i64 },
                doc! { "$set": { "banned": banned, "banned_at": banned_at } },
            )
            .await?;
        self.roster.invalidate(&());
        Ok(result.matched_count > 0)
    }

    /// Set or clear the daily limit. Returns `false` if not in the roster.
    pub async fn set_limit(&self, user_id: u64, limit: Option<i64>) -> Result<bool> {
        let limit = limit.map(Bson::Int64).unwrap_or(Bson::Null);
        let result = self
            .collection
            .update_one(
                doc! { "user_id": user_id as i64 },
                doc! { "$set": { "daily_limit": limit } },
            )
            .await?;
        self.roster.invalidate(&());
        Ok(result.matched_count > 0)
    }
}
