use async_trait::async_trait;
use guess_core::model::{
    DailyCalendar, DailyPlaylist, DateKey, Song, SongId, filter_by_category,
};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid record {context}: {source}")]
    InvalidRecord {
        context: String,
        #[source]
        source: guess_core::error::Error,
    },
}

/// Read-only access to the song catalog.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// All songs, in catalog order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn list_songs(&self) -> Result<Vec<Song>, StorageError>;

    /// Fetch a song by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_song(&self, id: SongId) -> Result<Song, StorageError>;

    /// Songs whose categories contain `token` (case-insensitive); `"all"` returns everything.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn songs_in_category(&self, token: &str) -> Result<Vec<Song>, StorageError> {
        let songs = self.list_songs().await?;
        Ok(filter_by_category(&songs, token))
    }
}

/// Date-keyed daily playlists.
#[async_trait]
pub trait DailyCalendarRepository: Send + Sync {
    /// The playlist authored for `key`. A missing day is `Ok(None)`, not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the calendar cannot be read.
    async fn playlist_for(&self, key: DateKey) -> Result<Option<DailyPlaylist>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    songs: Arc<Mutex<Vec<Song>>>,
    calendar: Arc<Mutex<DailyCalendar>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_catalog(songs: Vec<Song>, calendar: DailyCalendar) -> Self {
        Self {
            songs: Arc::new(Mutex::new(songs)),
            calendar: Arc::new(Mutex::new(calendar)),
        }
    }

    /// Insert a song, replacing one with the same id in place.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn upsert_song(&self, song: Song) -> Result<(), StorageError> {
        let mut guard = self
            .songs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        match guard.iter_mut().find(|s| s.id() == song.id()) {
            Some(existing) => *existing = song,
            None => guard.push(song),
        }
        Ok(())
    }

    /// Set the songs for one day.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn set_day(&self, key: DateKey, songs: Vec<Song>) -> Result<(), StorageError> {
        let mut guard = self
            .calendar
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key, songs);
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn list_songs(&self) -> Result<Vec<Song>, StorageError> {
        let guard = self
            .songs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn get_song(&self, id: SongId) -> Result<Song, StorageError> {
        let guard = self
            .songs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .iter()
            .find(|s| s.id() == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl DailyCalendarRepository for InMemoryRepository {
    async fn playlist_for(&self, key: DateKey) -> Result<Option<DailyPlaylist>, StorageError> {
        let guard = self
            .calendar
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.playlist_for(key))
    }
}

/// Aggregates catalog and calendar repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub calendar: Arc<dyn DailyCalendarRepository>,
}

impl Storage {
    #[must_use]
    pub fn from_repository(repo: InMemoryRepository) -> Self {
        let catalog: Arc<dyn CatalogRepository> = Arc::new(repo.clone());
        let calendar: Arc<dyn DailyCalendarRepository> = Arc::new(repo);
        Self { catalog, calendar }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_song(id: u64, category: &str) -> Song {
        Song::new(SongId::new(id), format!("Song {id}"), "Artist", "/s.mp3")
            .unwrap()
            .with_categories([category])
    }

    #[tokio::test]
    async fn upsert_replaces_in_place_and_keeps_order() {
        let repo = InMemoryRepository::new();
        repo.upsert_song(build_song(1, "pop")).unwrap();
        repo.upsert_song(build_song(2, "rock")).unwrap();
        repo.upsert_song(build_song(1, "rock")).unwrap();

        let songs = repo.list_songs().await.unwrap();
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].id(), SongId::new(1));
        assert_eq!(songs[0].categories(), &["rock".to_string()]);
    }

    #[tokio::test]
    async fn category_filter_uses_default_method() {
        let repo = InMemoryRepository::new();
        repo.upsert_song(build_song(1, "Pop")).unwrap();
        repo.upsert_song(build_song(2, "Rock")).unwrap();

        assert_eq!(repo.songs_in_category("pop").await.unwrap().len(), 1);
        assert_eq!(repo.songs_in_category("all").await.unwrap().len(), 2);
        assert!(repo.songs_in_category("jazz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_song_and_missing_day() {
        let repo = InMemoryRepository::new();
        assert!(matches!(
            repo.get_song(SongId::new(5)).await,
            Err(StorageError::NotFound)
        ));
        let key: DateKey = "2025-06-01".parse().unwrap();
        assert!(repo.playlist_for(key).await.unwrap().is_none());

        repo.set_day(key, vec![build_song(3, "pop")]).unwrap();
        let playlist = repo.playlist_for(key).await.unwrap().unwrap();
        assert_eq!(playlist.songs()[0].id(), SongId::new(3));
    }
}
