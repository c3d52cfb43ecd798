//! Music catalog repository (folders and tracks).

use std::sync::Arc;

use anyhow::Result;
use futures::{StreamExt, TryStreamExt};
use mongodb::bson::{doc, from_document, Document};
use mongodb::Collection;
use tracing::{info, warn};

use crate::cache::{CacheConfig, CacheRegistry, TypedCache};
use crate::database::models::{Folder, Track};
use crate::database::Database;

pub struct MusicRepository {
    db: Arc<Database>,
    folders: Collection<Folder>,
    tracks: Collection<Track>,
    folder_list: TypedCache<(), Vec<Folder>>,
}

/// Escape a user query for a MongoDB `$regex`.
fn escape_regex(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive substring match on title or artist.
fn title_or_artist(query: &str) -> Document {
    let pattern = escape_regex(query.trim());
    doc! {
        "$or": [
            { "title": { "$regex": pattern.as_str(), "$options": "i" } },
            { "artist": { "$regex": pattern.as_str(), "$options": "i" } },
        ]
    }
}

impl MusicRepository {
    pub fn new(db: Arc<Database>, cache: &CacheRegistry) -> Self {
        Self {
            folders: db.collection("folders"),
            tracks: db.collection("tracks"),
            folder_list: cache.get_or_create("music_folders", CacheConfig::roster()),
            db,
        }
    }

    // --- Folders ---

    pub async fn folders(&self) -> Result<Vec<Folder>> {
        if let Some(list) = self.folder_list.get(&()) {
            return Ok(list);
        }
        let ticket = self.folder_list.ticket();
        let list: Vec<Folder> = self
            .folders
            .find(doc! {})
            .sort(doc! { "id": 1 })
            .await?
            .try_collect()
            .await?;
        self.folder_list.fill((), list.clone(), ticket);
        Ok(list)
    }

    pub async fn folder(&self, id: i64) -> Result<Option<Folder>> {
        Ok(self.folders().await?.into_iter().find(|f| f.id == id))
    }

    /// Create a folder. `None` if the name is taken.
    pub async fn create_folder(&self, name: &str, description: &str) -> Result<Option<i64>> {
        if self.folders().await?.iter().any(|f| f.name == name) {
            return Ok(None);
        }
        let id = self.db.next_id("folders").await?;
        self.folders
            .insert_one(Folder {
                id,
                name: name.to_string(),
                description: description.to_string(),
            })
            .await?;
        self.folder_list.invalidate(&());
        info!("Created music folder {} ({})", id, name);
        Ok(Some(id))
    }

    /// Rename a folder. `false` if it does not exist.
    pub async fn edit_folder(&self, id: i64, name: &str, description: &str) -> Result<bool> {
        let result = self
            .folders
            .update_one(
                doc! { "id": id },
                doc! { "$set": { "name": name, "description": description } },
            )
            .await?;
        self.folder_list.invalidate(&());
        Ok(result.matched_count > 0)
    }

    /// Delete a folder and its tracks. `None` if the folder does not exist,
    /// otherwise the number of tracks removed with it.
    pub async fn delete_folder(&self, id: i64) -> Result<Option<u64>> {
        let removed = self.folders.delete_one(doc! { "id": id }).await?;
        self.folder_list.invalidate(&());
        if removed.deleted_count == 0 {
            return Ok(None);
        }
        let tracks = self.tracks.delete_many(doc! { "folder_id": id }).await?;
        info!("Deleted folder {} with {} track(s)", id, tracks.deleted_count);
        Ok(Some(tracks.deleted_count))
    }

    // --- Tracks ---

    pub async fn add_track(
        &self,
        folder_id: i64,
        title: &str,
        artist: &str,
        file_id: &str,
        added_by: u64,
    ) -> Result<i64> {
        let id = self.db.next_id("tracks").await?;
        self.tracks
            .insert_one(Track {
                id,
                title: title.to_string(),
                artist: artist.to_string(),
                file_id: file_id.to_string(),
                folder_id,
                added_by: Some(added_by),
                added_at: chrono::Utc::now().timestamp(),
            })
            .await?;
        Ok(id)
    }

    pub async fn edit_track(&self, id: i64, title: &str, artist: &str) -> Result<bool> {
        let result = self
            .tracks
            .update_one(
                doc! { "id": id },
                doc! { "$set": { "title": title, "artist": artist } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    pub async fn remove_tracks(&self, ids: &[i64]) -> Result<u64> {
        let result = self
            .tracks
            .delete_many(doc! { "id": { "$in": ids.to_vec() } })
            .await?;
        Ok(result.deleted_count)
    }

    pub async fn track(&self, id: i64) -> Result<Option<Track>> {
        Ok(self.tracks.find_one(doc! { "id": id }).await?)
    }

    pub async fn tracks_in(&self, folder_id: i64) -> Result<Vec<Track>> {
        Ok(self
            .tracks
            .find(doc! { "folder_id": folder_id })
            .sort(doc! { "id": 1 })
            .await?
            .try_collect()
            .await?)
    }

    pub async fn all_tracks(&self) -> Result<Vec<Track>> {
        Ok(self
            .tracks
            .find(doc! {})
            .sort(doc! { "id": 1 })
            .await?
            .try_collect()
            .await?)
    }

    /// First track whose title or artist contains `query`.
    pub async fn find_first(&self, query: &str) -> Result<Option<Track>> {
        Ok(self.tracks.find_one(title_or_artist(query)).await?)
    }

    pub async fn search(&self, query: &str, limit: i64) -> Result<Vec<Track>> {
        Ok(self
            .tracks
            .find(title_or_artist(query))
            .sort(doc! { "id": 1 })
            .limit(limit)
            .await?
            .try_collect()
            .await?)
    }

    /// A uniformly random track.
    pub async fn random_track(&self) -> Result<Option<Track>> {
        let mut cursor = self
            .tracks
            .aggregate(vec![doc! { "$sample": { "size": 1 } }])
            .await?;

        while let Some(result) = cursor.next().await {
            match from_document::<Track>(result?) {
                Ok(track) => return Ok(Some(track)),
                Err(e) => warn!("Skipping malformed track document: {}", e),
            }
        }
        Ok(None)
    }

    pub async fn counts(&self) -> Result<(u64, u64)> {
        let folders = self.folders.count_documents(doc! {}).await?;
        let tracks = self.tracks.count_documents(doc! {}).await?;
        Ok((folders, tracks))
    }

    pub async fn count_in(&self, folder_id: i64) -> Result<u64> {
        Ok(self
            .tracks
            .count_documents(doc! { "folder_id": folder_id })
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_regex() {
        assert_eq!(escape_regex("a.b*(c)"), r"a\.b\*\(c\)");
        assert_eq!(escape_regex("plain words"), "plain words");
    }

    #[test]
    fn test_title_or_artist_filter() {
        let filter = title_or_artist(" lo.fi ");
        let clauses = filter.get_array("$or").unwrap();
        assert_eq!(clauses.len(), 2);
        let title = clauses[0].as_document().unwrap().get_document("title").unwrap();
        assert_eq!(title.get_str("$regex").unwrap(), r"lo\.fi");
        assert_eq!(title.get_str("$options").unwrap(), "i");
    }
}
