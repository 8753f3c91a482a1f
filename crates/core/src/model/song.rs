use serde::Serialize;
use thiserror::Error;

use crate::model::ids::SongId;

/// Category token that bypasses filtering.
pub const ALL_CATEGORIES: &str = "all";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SongError {
    #[error("song title cannot be empty")]
    EmptyTitle,

    #[error("song artist cannot be empty")]
    EmptyArtist,

    #[error("song audio reference cannot be empty")]
    EmptyAudioRef,
}

//
// ─── SONG ──────────────────────────────────────────────────────────────────────
//

/// A catalog entry. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Song {
    id: SongId,
    title: String,
    artist: String,
    audio_ref: String,
    cover_ref: Option<String>,
    categories: Vec<String>,
    daily_category_label: Option<String>,
}

impl Song {
    /// Create a validated song.
    ///
    /// Title, artist and audio reference are trimmed and must be non-empty.
    ///
    /// # Errors
    ///
    /// Returns `SongError` when a required field is blank.
    pub fn new(
        id: SongId,
        title: impl Into<String>,
        artist: impl Into<String>,
        audio_ref: impl Into<String>,
    ) -> Result<Self, SongError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(SongError::EmptyTitle);
        }
        let artist = artist.into().trim().to_string();
        if artist.is_empty() {
            return Err(SongError::EmptyArtist);
        }
        let audio_ref = audio_ref.into().trim().to_string();
        if audio_ref.is_empty() {
            return Err(SongError::EmptyAudioRef);
        }

        Ok(Self {
            id,
            title,
            artist,
            audio_ref,
            cover_ref: None,
            categories: Vec::new(),
            daily_category_label: None,
        })
    }

    #[must_use]
    pub fn with_cover(mut self, cover_ref: impl Into<String>) -> Self {
        let cover = cover_ref.into();
        self.cover_ref = (!cover.trim().is_empty()).then_some(cover);
        self
    }

    /// Attach categories; blank entries and duplicates are dropped.
    #[must_use]
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for category in categories {
            let category = category.into().trim().to_string();
            if !category.is_empty() && !out.contains(&category) {
                out.push(category);
            }
        }
        self.categories = out;
        self
    }

    #[must_use]
    pub fn with_daily_category_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        self.daily_category_label = (!label.trim().is_empty()).then_some(label);
        self
    }

    #[must_use]
    pub fn id(&self) -> SongId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn artist(&self) -> &str {
        &self.artist
    }

    #[must_use]
    pub fn audio_ref(&self) -> &str {
        &self.audio_ref
    }

    #[must_use]
    pub fn cover_ref(&self) -> Option<&str> {
        self.cover_ref.as_deref()
    }

    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    #[must_use]
    pub fn daily_category_label(&self) -> Option<&str> {
        self.daily_category_label.as_deref()
    }

    /// Case-insensitive substring containment of `token` in any category.
    ///
    /// The `"all"` token matches every song.
    #[must_use]
    pub fn in_category(&self, token: &str) -> bool {
        let token = token.trim().to_lowercase();
        if token == ALL_CATEGORIES {
            return true;
        }
        self.categories
            .iter()
            .any(|c| c.to_lowercase().contains(&token))
    }
}

/// Filter a catalog down to the songs in `token`, preserving catalog order.
#[must_use]
pub fn filter_by_category(songs: &[Song], token: &str) -> Vec<Song> {
    songs
        .iter()
        .filter(|song| song.in_category(token))
        .cloned()
        .collect()
}

/// Human readable name for a category token.
#[must_use]
pub fn category_display_name(token: &str) -> String {
    match token.trim().to_lowercase().as_str() {
        "all" => "All".to_string(),
        "pop" => "Pop".to_string(),
        "rock" => "Rock".to_string(),
        _ => token.to_string(),
    }
}
