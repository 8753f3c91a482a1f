use guess_core::model::{DateKey, Song, SongId};
use serde::{Deserialize, Serialize};

use crate::repository::StorageError;

/// On-disk shape of a song, as found in `songs.json` and `daily.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongRecord {
    #[serde(default)]
    pub id: Option<u64>,
    pub title: String,
    pub artist: String,
    #[serde(alias = "audio")]
    pub snippet: String,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, alias = "dailyCategoryLabel")]
    pub daily_category: Option<String>,
}

impl SongRecord {
    #[must_use]
    pub fn from_song(song: &Song) -> Self {
        Self {
            id: Some(song.id().value()),
            title: song.title().to_owned(),
            artist: song.artist().to_owned(),
            snippet: song.audio_ref().to_owned(),
            cover: song.cover_ref().map(str::to_owned),
            categories: song.categories().to_vec(),
            daily_category: song.daily_category_label().map(str::to_owned),
        }
    }

    /// Convert the record into a domain `Song`, using `fallback_id` when the
    /// record carries none.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidRecord` if the song fails validation.
    pub fn into_song(self, fallback_id: u64, context: &str) -> Result<Song, StorageError> {
        let id = SongId::new(self.id.unwrap_or(fallback_id));
        let mut song = Song::new(id, self.title, self.artist, self.snippet)
            .map_err(|e| invalid(context, e))?
            .with_categories(self.categories);
        if let Some(cover) = self.cover {
            song = song.with_cover(cover);
        }
        if let Some(label) = self.daily_category {
            song = song.with_daily_category_label(label);
        }
        Ok(song)
    }
}

pub(crate) fn parse_date_key(raw: &str) -> Result<DateKey, StorageError> {
    raw.parse::<DateKey>()
        .map_err(|e| invalid(&format!("date {raw}"), e))
}

fn invalid(context: &str, err: impl Into<guess_core::error::Error>) -> StorageError {
    StorageError::InvalidRecord {
        context: context.to_string(),
        source: err.into(),
    }
}
