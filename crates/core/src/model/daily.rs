use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::model::Song;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DateKeyError {
    #[error("invalid date key {raw:?}, expected YYYY-MM-DD")]
    Invalid { raw: String },
}

//
// ─── DATE KEY ──────────────────────────────────────────────────────────────────
//

/// Calendar day (`YYYY-MM-DD`) in the reference time zone.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateKey(NaiveDate);

impl DateKey {
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl fmt::Debug for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DateKey({self})")
    }
}

impl FromStr for DateKey {
    type Err = DateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        // Insist on the zero-padded form so keys compare as authored.
        if trimmed.len() != 10 {
            return Err(DateKeyError::Invalid { raw: s.to_string() });
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map(Self)
            .map_err(|_| DateKeyError::Invalid { raw: s.to_string() })
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

//
// ─── PLAYLIST ──────────────────────────────────────────────────────────────────
//

/// Songs authored for one calendar day, in presentation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyPlaylist {
    date_key: DateKey,
    songs: Vec<Song>,
}

impl DailyPlaylist {
    /// Returns `None` for an empty song list; an empty day is the same as no day.
    #[must_use]
    pub fn new(date_key: DateKey, songs: Vec<Song>) -> Option<Self> {
        if songs.is_empty() {
            return None;
        }
        Some(Self { date_key, songs })
    }

    #[must_use]
    pub fn date_key(&self) -> DateKey {
        self.date_key
    }

    #[must_use]
    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.songs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Label of the day's theme, taken from the first song that carries one.
    #[must_use]
    pub fn category_label(&self) -> Option<&str> {
        self.songs.iter().find_map(Song::daily_category_label)
    }
}

//
// ─── CALENDAR ──────────────────────────────────────────────────────────────────
//

/// Static mapping from date key to that day's songs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyCalendar {
    days: BTreeMap<DateKey, Vec<Song>>,
}

impl DailyCalendar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the songs for a day.
    pub fn insert(&mut self, key: DateKey, songs: Vec<Song>) {
        self.days.insert(key, songs);
    }

    #[must_use]
    pub fn with_day(mut self, key: DateKey, songs: Vec<Song>) -> Self {
        self.insert(key, songs);
        self
    }

    /// Pure lookup; a missing or empty day yields `None`.
    #[must_use]
    pub fn playlist_for(&self, key: DateKey) -> Option<DailyPlaylist> {
        self.days
            .get(&key)
            .and_then(|songs| DailyPlaylist::new(key, songs.clone()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.days.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}
