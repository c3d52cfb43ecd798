//! Music catalog models.

use serde::{Deserialize, Serialize};

/// A named folder of tracks. Names are unique.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// An audio file stored on Telegram, referenced by `file_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub file_id: String,
    pub folder_id: i64,
    #[serde(default)]
    pub added_by: Option<u64>,
    pub added_at: i64,
}

impl Track {
    /// `Title - Artist`, or just the title when the artist is blank.
    pub fn label(&self) -> String {
        if self.artist.trim().is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.title, self.artist)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(artist: &str) -> Track {
        Track {
            id: 1,
            title: "Song".into(),
            artist: artist.into(),
            file_id: "f".into(),
            folder_id: 1,
            added_by: None,
            added_at: 0,
        }
    }

    #[test]
    fn test_label() {
        assert_eq!(track("Band").label(), "Song - Band");
        assert_eq!(track(" ").label(), "Song");
    }
}
