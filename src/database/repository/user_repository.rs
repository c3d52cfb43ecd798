//! Known-user directory, indexed by id and by handle.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::FindOptions;
use mongodb::Collection;
use teloxide::types::User;
use tokio::spawn;
use tracing::{debug, warn};

use crate::cache::{CacheConfig, CacheRegistry, TypedCache};
use crate::database::models::KnownUser;
use crate::database::Database;

pub struct UserRepository {
    collection: Collection<KnownUser>,
    by_id: TypedCache<u64, KnownUser>,
    by_username: TypedCache<String, u64>,
}

impl UserRepository {
    pub fn new(db: &Database, cache: &CacheRegistry) -> Self {
        Self {
            collection: db.collection("users"),
            by_id: cache.get_or_create(
                "users_by_id",
                CacheConfig::with_capacity(10_000).ttl(Duration::from_secs(3600)),
            ),
            // Shorter TTL so renamed handles age out.
            by_username: cache.get_or_create(
                "users_by_username",
                CacheConfig::with_capacity(10_000).ttl(Duration::from_secs(1800)),
            ),
        }
    }

    fn remember(&self, user: &KnownUser) {
        self.by_id.insert(user.user_id, user.clone());
        if let Some(username) = &user.username {
            self.by_username.insert(username.clone(), user.user_id);
        }
    }

    /// Record a sender. Skips the write when the cached profile is unchanged.
    pub async fn track(&self, user: &User) -> Result<()> {
        if let Some(cached) = self.by_id.get(&user.id.0) {
            if !cached.differs_from(user) {
                return Ok(());
            }
            if let Some(old) = &cached.username {
                self.by_username.invalidate(old);
            }
        }

        let known = KnownUser::from_telegram(user);
        self.remember(&known);
        self.collection
            .replace_one(doc! { "user_id": known.user_id as i64 }, &known)
            .upsert(true)
            .await?;

        debug!("Tracked user {} (@{:?})", known.user_id, known.username);
        Ok(())
    }

    pub fn track_background(self: Arc<Self>, user: User) {
        spawn(async move {
            if let Err(e) = self.track(&user).await {
                warn!("Failed to track user {}: {}", user.id, e);
            }
        });
    }

    pub async fn get(&self, user_id: u64) -> Result<Option<KnownUser>> {
        if let Some(user) = self.by_id.get(&user_id) {
            return Ok(Some(user));
        }
        let found = self
            .collection
            .find_one(doc! { "user_id": user_id as i64 })
            .await?;
        if let Some(user) = &found {
            self.remember(user);
        }
        Ok(found)
    }

    /// Case-insensitive handle lookup. A leading `@` is ignored.
    pub async fn resolve_username(&self, handle: &str) -> Result<Option<u64>> {
        let username = handle.trim_start_matches('@').to_lowercase();
        if let Some(id) = self.by_username.get(&username) {
            return Ok(Some(id));
        }
        let found = self
            .collection
            .find_one(doc! { "username": username.as_str() })
            .await?;
        Ok(found.map(|user| {
            self.remember(&user);
            user.user_id
        }))
    }

    /// Every recorded user id.
    pub async fn ids(&self) -> Result<Vec<u64>> {
        let projection: Document = doc! { "user_id": 1, "_id": 0 };
        let docs: Vec<Document> = self
            .collection
            .clone_with_type::<Document>()
            .find(doc! {})
            .with_options(FindOptions::builder().projection(projection).build())
            .await?
            .try_collect()
            .await?;
        Ok(docs
            .iter()
            .filter_map(|d| d.get_i64("user_id").ok())
            .map(|id| id as u64)
            .collect())
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }
}
