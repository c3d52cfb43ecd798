//! Chat registry repository.
//!
//! Every inbound message touches its chat. A short-lived "seen" cache keeps
//! that from turning into a write per message.

use anyhow::Result;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::Collection;
use tracing::debug;

use crate::cache::{CacheConfig, CacheRegistry, TypedCache};
use crate::database::models::ChatRecord;
use crate::database::Database;

pub struct ChatRepository {
    collection: Collection<ChatRecord>,
    seen: TypedCache<i64, ()>,
}

impl ChatRepository {
    pub fn new(db: &Database, cache: &CacheRegistry) -> Self {
        Self {
            collection: db.collection("chats"),
            seen: cache.get_or_create("chats_seen", CacheConfig::seen_recently()),
        }
    }

    /// Whether the chat was written recently enough to skip this touch.
    pub fn seen_recently(&self, chat_id: i64) -> bool {
        self.seen.contains(&chat_id)
    }

    /// Upsert a chat. `first_seen` is only written on insert.
    pub async fn upsert(&self, record: &ChatRecord) -> Result<()> {
        self.collection
            .update_one(
                doc! { "chat_id": record.chat_id },
                doc! {
                    "$set": {
                        "chat_type": record.chat_type.as_str(),
                        "title": record.title.clone(),
                        "username": record.username.clone(),
                        "member_count": record.member_count.map(i64::from),
                        "last_seen": record.last_seen,
                        "active": true,
                    },
                    "$setOnInsert": { "first_seen": record.first_seen },
                },
            )
            .upsert(true)
            .await?;

        self.seen.insert(record.chat_id, ());
        debug!("Tracked chat {}", record.chat_id);
        Ok(())
    }

    /// Flag a chat the bot can no longer post to.
    pub async fn mark_inactive(&self, chat_id: i64) -> Result<()> {
        self.collection
            .update_one(doc! { "chat_id": chat_id }, doc! { "$set": { "active": false } })
            .await?;
        self.seen.invalidate(&chat_id);
        Ok(())
    }

    /// All chats, most recently seen first.
    pub async fn all(&self) -> Result<Vec<ChatRecord>> {
        Ok(self
            .collection
            .find(doc! {})
            .sort(doc! { "last_seen": -1 })
            .await?
            .try_collect()
            .await?)
    }

    pub async fn active(&self) -> Result<Vec<ChatRecord>> {
        Ok(self.all().await?.into_iter().filter(|c| c.active).collect())
    }
}
