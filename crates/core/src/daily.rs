//! Daily challenge: a fixed, date-keyed, ordered sequence of rounds.

use serde::Serialize;

use crate::model::{DailyCalendar, DailyPlaylist, DateKey, LevelLadder, SongId};
use crate::session::{GameSession, Outcome, SessionSnapshot, Transition};
use crate::time::{Clock, ReferenceZone};
use crate::timer::TimerEvent;

/// Whether a challenge exists for a given day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DailyAvailability {
    Available(DailyPlaylist),
    Unavailable { date_key: DateKey },
}

impl DailyAvailability {
    #[must_use]
    pub fn date_key(&self) -> DateKey {
        match self {
            DailyAvailability::Available(playlist) => playlist.date_key(),
            DailyAvailability::Unavailable { date_key } => *date_key,
        }
    }

    #[must_use]
    pub fn into_playlist(self) -> Option<DailyPlaylist> {
        match self {
            DailyAvailability::Available(playlist) => Some(playlist),
            DailyAvailability::Unavailable { .. } => None,
        }
    }

    /// Wrap the result of a calendar lookup for `key`.
    #[must_use]
    pub fn from_lookup(key: DateKey, found: Option<DailyPlaylist>) -> Self {
        found.map_or(DailyAvailability::Unavailable { date_key: key }, DailyAvailability::Available)
    }

    /// Pure lookup of today's challenge, with "today" taken from `clock` in `zone`.
    #[must_use]
    pub fn today(calendar: &DailyCalendar, clock: &Clock, zone: ReferenceZone) -> Self {
        let key = clock.today_in(zone);
        Self::from_lookup(key, calendar.playlist_for(key))
    }
}

/// How one song of the day ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoundResult {
    pub song_id: SongId,
    pub outcome: Outcome,
    pub attempts: usize,
}

/// Position within the day's playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyProgress {
    playlist: DailyPlaylist,
    song_index: usize,
    completed: bool,
    results: Vec<RoundResult>,
}

impl DailyProgress {
    #[must_use]
    pub fn playlist(&self) -> &DailyPlaylist {
        &self.playlist
    }

    #[must_use]
    pub fn song_index(&self) -> usize {
        self.song_index
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn results(&self) -> &[RoundResult] {
        &self.results
    }

    #[must_use]
    pub fn is_last_song(&self) -> bool {
        self.song_index + 1 >= self.playlist.len()
    }
}

/// What the daily view renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySnapshot {
    pub date_key: DateKey,
    pub category_label: Option<String>,
    pub song_index: usize,
    pub song_count: usize,
    pub completed: bool,
    pub results: Vec<RoundResult>,
    pub session: SessionSnapshot,
}

/// Runs one `GameSession` per playlist song, in authored order.
#[derive(Debug)]
pub struct DailySequencer {
    progress: DailyProgress,
    session: GameSession,
}

impl DailySequencer {
    /// Load the first song of `playlist` into a fresh session.
    #[must_use]
    pub fn start(playlist: DailyPlaylist, ladder: LevelLadder) -> (Self, Transition) {
        let mut session = GameSession::new(ladder);
        let first = playlist.songs()[0].clone();
        let transition = session.load_song(first);
        let sequencer = Self {
            progress: DailyProgress {
                playlist,
                song_index: 0,
                completed: false,
                results: Vec::new(),
            },
            session,
        };
        (sequencer, transition)
    }

    #[must_use]
    pub fn progress(&self) -> &DailyProgress {
        &self.progress
    }

    #[must_use]
    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// Move past a finished round: load the next song, or mark the day complete.
    ///
    /// Ignored while the current round is still in progress or once the day is done.
    pub fn advance(&mut self) -> Transition {
        if self.progress.completed || !self.session.is_terminal() {
            return Transition::ignored();
        }

        if let Some(round) = self.session.round() {
            self.progress.results.push(RoundResult {
                song_id: round.song().id(),
                outcome: round.outcome(),
                attempts: round.attempts().len(),
            });
        }

        if self.progress.is_last_song() {
            self.progress.completed = true;
            // Leave the final round in place so its reveal stays available.
            return Transition::default();
        }

        self.progress.song_index += 1;
        let next = self.progress.playlist.songs()[self.progress.song_index].clone();
        self.session.load_song(next)
    }

    pub fn play(&mut self) -> Transition {
        self.session.play()
    }

    pub fn stop(&mut self) -> Transition {
        self.session.stop()
    }

    pub fn submit_guess(&mut self, raw: &str) -> Transition {
        self.session.submit_guess(raw)
    }

    pub fn skip(&mut self) -> Transition {
        self.session.skip()
    }

    pub fn give_up(&mut self) -> Transition {
        self.session.give_up()
    }

    pub fn start_reveal(&mut self) -> Transition {
        self.session.start_reveal()
    }

    pub fn stop_reveal(&mut self) -> Transition {
        self.session.stop_reveal()
    }

    pub fn on_timer(&mut self, event: TimerEvent) -> Transition {
        self.session.on_timer(event)
    }

    /// Cancel everything when leaving daily mode.
    pub fn abandon(&mut self) -> Transition {
        self.session.clear()
    }

    #[must_use]
    pub fn snapshot(&self) -> DailySnapshot {
        DailySnapshot {
            date_key: self.progress.playlist.date_key(),
            category_label: self.progress.playlist.category_label().map(str::to_string),
            song_index: self.progress.song_index,
            song_count: self.progress.playlist.len(),
            completed: self.progress.completed,
            results: self.progress.results.clone(),
            session: self.session.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Song;
    use crate::session::SessionStatus;
    use crate::time::fixed_clock;

    fn song(id: u64) -> Song {
        Song::new(SongId::new(id), format!("Song {id}"), "Band", format!("/s/{id}.mp3")).unwrap()
    }

    fn playlist(n: u64) -> DailyPlaylist {
        let key: DateKey = "2023-11-14".parse().unwrap();
        DailyPlaylist::new(key, (1..=n).map(song).collect()).unwrap()
    }

    fn current_id(seq: &DailySequencer) -> SongId {
        seq.session().current_song().unwrap().id()
    }

    #[test]
    fn missing_day_is_reported_as_unavailable() {
        let calendar = DailyCalendar::new();
        let availability = DailyAvailability::today(&calendar, &fixed_clock(), ReferenceZone::utc());
        assert_eq!(
            availability,
            DailyAvailability::Unavailable {
                date_key: "2023-11-14".parse().unwrap()
            }
        );
        assert!(availability.into_playlist().is_none());
    }

    #[test]
    fn today_uses_reference_zone_not_utc() {
        let key: DateKey = "2023-11-15".parse().unwrap();
        let calendar = DailyCalendar::new().with_day(key, vec![song(9)]);
        let east = ReferenceZone::from_offset_minutes(120).unwrap();

        let found = DailyAvailability::today(&calendar, &fixed_clock(), east);
        assert_eq!(found.date_key(), key);
        assert!(matches!(found, DailyAvailability::Available(_)));

        let utc = DailyAvailability::today(&calendar, &fixed_clock(), ReferenceZone::utc());
        assert!(matches!(utc, DailyAvailability::Unavailable { .. }));
    }

    #[test]
    fn starts_on_first_song_in_authored_order() {
        let (seq, transition) = DailySequencer::start(playlist(3), LevelLadder::standard());
        assert!(!transition.ignored);
        assert_eq!(current_id(&seq), SongId::new(1));
        assert_eq!(seq.progress().song_index(), 0);
        assert_eq!(seq.session().status(), SessionStatus::Idle);
    }

    #[test]
    fn advance_is_ignored_mid_round() {
        let (mut seq, _) = DailySequencer::start(playlist(3), LevelLadder::standard());
        seq.skip();
        assert!(seq.advance().ignored);
        assert_eq!(seq.progress().song_index(), 0);
    }

    #[test]
    fn three_song_day_completes_after_third_round() {
        let (mut seq, _) = DailySequencer::start(playlist(3), LevelLadder::standard());

        seq.submit_guess("Song 1 - Band");
        assert!(!seq.advance().ignored);
        assert_eq!(current_id(&seq), SongId::new(2));
        assert_eq!(seq.session().status(), SessionStatus::Idle);
        assert_eq!(seq.session().round().unwrap().level_index(), 0);

        seq.give_up();
        seq.advance();
        assert_eq!(current_id(&seq), SongId::new(3));

        for _ in 0..8 {
            seq.skip();
        }
        assert_eq!(seq.session().status(), SessionStatus::Exhausted);
        let t = seq.advance();
        assert!(t.effects.is_empty());
        assert!(seq.progress().completed());
        assert_eq!(current_id(&seq), SongId::new(3));

        let outcomes: Vec<Outcome> = seq.progress().results().iter().map(|r| r.outcome).collect();
        assert_eq!(
            outcomes,
            vec![Outcome::Correct, Outcome::GaveUp, Outcome::Exhausted]
        );
        assert!(seq.advance().ignored);
        assert_eq!(seq.progress().results().len(), 3);
    }

    #[test]
    fn reveal_stays_available_after_completion() {
        let (mut seq, _) = DailySequencer::start(playlist(1), LevelLadder::standard());
        seq.give_up();
        seq.advance();
        assert!(seq.progress().completed());
        assert!(!seq.start_reveal().ignored);
        assert!(seq.snapshot().session.reveal_playing);
        assert!(seq.snapshot().completed);
    }
}
