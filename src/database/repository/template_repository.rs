//! Template repository.
//!
//! Loop ticks read a category's list on every target, so lists are served
//! from cache and invalidated on each add/remove. A list loaded while a
//! write was in flight is returned but not cached.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::Collection;
use tracing::debug;

use crate::cache::{CacheConfig, CacheRegistry, TypedCache};
use crate::database::models::TemplateDoc;
use crate::database::Database;
use crate::modes::{Category, Template, TemplateStore};

pub struct TemplateRepository {
    db: Arc<Database>,
    collection: Collection<TemplateDoc>,
    lists: TypedCache<Category, Vec<Template>>,
}

impl TemplateRepository {
    pub fn new(db: Arc<Database>, cache: &CacheRegistry) -> Self {
        Self {
            collection: db.collection("templates"),
            lists: cache.get_or_create("template_lists", CacheConfig::roster()),
            db,
        }
    }

    pub async fn count(&self, category: Category) -> Result<usize> {
        Ok(self.list(category).await?.len())
    }
}

#[async_trait]
impl TemplateStore for TemplateRepository {
    async fn add(&self, category: Category, text: &str) -> Result<i64> {
        let id = self.db.next_id("templates").await?;
        self.collection
            .insert_one(TemplateDoc::new(id, category, text))
            .await?;
        self.lists.invalidate(&category);

        debug!("Added {} template {}", category, id);
        Ok(id)
    }

    async fn list(&self, category: Category) -> Result<Vec<Template>> {
        if let Some(list) = self.lists.get(&category) {
            return Ok(list);
        }

        let ticket = self.lists.ticket();
        let docs: Vec<TemplateDoc> = self
            .collection
            .find(doc! { "category": category.as_str() })
            .sort(doc! { "id": 1 })
            .await?
            .try_collect()
            .await?;

        let list: Vec<Template> = docs.into_iter().map(Template::from).collect();
        self.lists.fill(category, list.clone(), ticket);
        Ok(list)
    }

    async fn remove(&self, category: Category, id: i64) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! { "id": id, "category": category.as_str() })
            .await?;
        self.lists.invalidate(&category);
        Ok(result.deleted_count > 0)
    }
}
