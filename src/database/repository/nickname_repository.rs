//! Nickname repository.

use anyhow::Result;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::Collection;

use crate::cache::{CacheConfig, CacheRegistry, TypedCache};
use crate::database::models::Nickname;
use crate::database::Database;
use crate::modes::NicknameStore;

pub struct NicknameRepository {
    collection: Collection<Nickname>,
    /// Caches misses too (`None`), since most mentioned users have no nickname.
    cache: TypedCache<u64, Option<String>>,
}

impl NicknameRepository {
    pub fn new(db: &Database, cache: &CacheRegistry) -> Self {
        Self {
            collection: db.collection("nicknames"),
            cache: cache.get_or_create("nicknames", CacheConfig::per_user()),
        }
    }

    pub async fn get(&self, user_id: u64) -> Result<Option<String>> {
        if let Some(cached) = self.cache.get(&user_id) {
            return Ok(cached);
        }

        let ticket = self.cache.ticket();
        let found = self
            .collection
            .find_one(doc! { "user_id": user_id as i64 })
            .await?
            .map(|n| n.nickname);

        self.cache.fill(user_id, found.clone(), ticket);
        Ok(found)
    }

    pub async fn set(&self, user_id: u64, nickname: &str) -> Result<()> {
        self.collection
            .replace_one(doc! { "user_id": user_id as i64 }, Nickname::new(user_id, nickname))
            .upsert(true)
            .await?;
        self.cache.insert(user_id, Some(nickname.to_string()));
        Ok(())
    }

    /// Returns whether a nickname existed.
    pub async fn remove(&self, user_id: u64) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! { "user_id": user_id as i64 })
            .await?;
        self.cache.insert(user_id, None);
        Ok(result.deleted_count > 0)
    }

    /// Every user with a nickname.
    pub async fn user_ids(&self) -> Result<Vec<u64>> {
        let all: Vec<Nickname> = self.collection.find(doc! {}).await?.try_collect().await?;
        Ok(all.into_iter().map(|n| n.user_id).collect())
    }
}

#[async_trait]
impl NicknameStore for NicknameRepository {
    async fn nickname(&self, user_id: u64) -> Result<Option<String>> {
        self.get(user_id).await
    }
}
