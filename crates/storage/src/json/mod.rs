//! JSON file adapter for the catalog (`songs.json`) and daily calendar (`daily.json`).
//!
//! `songs.json` is an array of song records. `daily.json` is an object keyed by
//! `YYYY-MM-DD`, each value an ordered array of song records.

mod mapping;

use std::collections::BTreeMap;
use std::path::Path;

use guess_core::model::{DailyCalendar, Song};

use crate::repository::{InMemoryRepository, Storage, StorageError};

pub use mapping::SongRecord;

/// Parse a catalog document.
///
/// Records without an `id` get their 1-based position.
///
/// # Errors
///
/// Returns `StorageError::Serialization` for malformed JSON and
/// `StorageError::InvalidRecord` for songs that fail validation.
pub fn parse_catalog(json: &str) -> Result<Vec<Song>, StorageError> {
    let records: Vec<SongRecord> =
        serde_json::from_str(json).map_err(|e| StorageError::Serialization(e.to_string()))?;
    records
        .into_iter()
        .enumerate()
        .map(|(idx, record)| record.into_song(idx as u64 + 1, &format!("song {idx}")))
        .collect()
}

/// Parse a daily calendar document.
///
/// # Errors
///
/// Returns `StorageError::Serialization` for malformed JSON and
/// `StorageError::InvalidRecord` for bad date keys or songs.
pub fn parse_calendar(json: &str) -> Result<DailyCalendar, StorageError> {
    let days: BTreeMap<String, Vec<SongRecord>> =
        serde_json::from_str(json).map_err(|e| StorageError::Serialization(e.to_string()))?;

    let mut calendar = DailyCalendar::new();
    for (raw_key, records) in days {
        let key = mapping::parse_date_key(&raw_key)?;
        let songs = records
            .into_iter()
            .enumerate()
            .map(|(idx, record)| {
                record.into_song(idx as u64 + 1, &format!("{raw_key} song {idx}"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        calendar.insert(key, songs);
    }
    Ok(calendar)
}

/// Load a catalog file.
///
/// # Errors
///
/// Returns `StorageError::Io` if the file cannot be read, or parse errors.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Vec<Song>, StorageError> {
    parse_catalog(&read(path.as_ref())?)
}

/// Load a daily calendar file.
///
/// # Errors
///
/// Returns `StorageError::Io` if the file cannot be read, or parse errors.
pub fn load_calendar(path: impl AsRef<Path>) -> Result<DailyCalendar, StorageError> {
    parse_calendar(&read(path.as_ref())?)
}

impl Storage {
    /// Build storage from a catalog file and an optional calendar file.
    ///
    /// A missing calendar path means "no daily challenges", not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if either file cannot be read or parsed.
    pub fn from_json_files(
        catalog: impl AsRef<Path>,
        calendar: Option<&Path>,
    ) -> Result<Self, StorageError> {
        let songs = load_catalog(catalog)?;
        let calendar = match calendar {
            Some(path) => load_calendar(path)?,
            None => DailyCalendar::new(),
        };
        Ok(Self::from_repository(InMemoryRepository::with_catalog(
            songs, calendar,
        )))
    }
}

fn read(path: &Path) -> Result<String, StorageError> {
    std::fs::read_to_string(path)
        .map_err(|e| StorageError::Io(format!("{}: {e}", path.display())))
}
