use std::sync::Arc;

use guess_core::daily::{DailyAvailability, DailySequencer, DailySnapshot};
use guess_core::model::{DailyPlaylist, DateKey, LevelLadder, Song};
use guess_core::session::Transition;
use guess_core::time::ReferenceZone;
use guess_core::timer::TimerEvent;
use storage::repository::DailyCalendarRepository;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::Clock;
use crate::audio::AudioDevice;
use crate::error::DailyError;
use crate::game::GuessResult;
use crate::playback::Playback;

/// Resolves "today" in the reference zone and starts the day's challenge.
#[derive(Clone)]
pub struct DailyService {
    clock: Clock,
    zone: ReferenceZone,
    calendar: Arc<dyn DailyCalendarRepository>,
    ladder: LevelLadder,
}

impl DailyService {
    #[must_use]
    pub fn new(
        clock: Clock,
        zone: ReferenceZone,
        calendar: Arc<dyn DailyCalendarRepository>,
    ) -> Self {
        Self {
            clock,
            zone,
            calendar,
            ladder: LevelLadder::standard(),
        }
    }

    #[must_use]
    pub fn zone(&self) -> ReferenceZone {
        self.zone
    }

    /// Today's key in the reference zone.
    #[must_use]
    pub fn today_key(&self) -> DateKey {
        self.clock.today_in(self.zone)
    }

    /// Challenge for an explicit day.
    ///
    /// # Errors
    ///
    /// Returns `DailyError::Storage` if the calendar cannot be read.
    pub async fn availability(&self, key: DateKey) -> Result<DailyAvailability, DailyError> {
        let found = self.calendar.playlist_for(key).await?;
        let availability = DailyAvailability::from_lookup(key, found);
        match &availability {
            DailyAvailability::Available(playlist) => {
                info!(date_key = %key, songs = playlist.len(), "daily challenge found");
            }
            DailyAvailability::Unavailable { .. } => {
                info!(date_key = %key, "no daily challenge");
            }
        }
        Ok(availability)
    }

    /// Challenge for today.
    ///
    /// # Errors
    ///
    /// Returns `DailyError::Storage` if the calendar cannot be read.
    pub async fn today(&self) -> Result<DailyAvailability, DailyError> {
        self.availability(self.today_key()).await
    }

    /// Begin `playlist` with its first song loaded. Must run inside a tokio runtime.
    #[must_use]
    pub fn start(&self, playlist: DailyPlaylist, audio: Arc<dyn AudioDevice>) -> DailyGame {
        DailyGame::start(playlist, self.ladder.clone(), audio)
    }
}

/// A day in progress: the sequencer plus the playback it drives.
pub struct DailyGame {
    sequencer: DailySequencer,
    playback: Playback,
    events: mpsc::UnboundedReceiver<TimerEvent>,
}

impl DailyGame {
    fn start(playlist: DailyPlaylist, ladder: LevelLadder, audio: Arc<dyn AudioDevice>) -> Self {
        let (mut playback, events) = Playback::new(audio);
        let (sequencer, transition) = DailySequencer::start(playlist, ladder);
        if let Some(song) = sequencer.session().current_song() {
            playback.load(song);
        }
        playback.apply(&transition);
        Self {
            sequencer,
            playback,
            events,
        }
    }

    #[must_use]
    pub fn sequencer(&self) -> &DailySequencer {
        &self.sequencer
    }

    #[must_use]
    pub fn audio_ref(&self) -> Option<&str> {
        self.sequencer.session().current_song().map(Song::audio_ref)
    }

    #[must_use]
    pub fn snapshot(&self) -> DailySnapshot {
        self.sequencer.snapshot()
    }

    pub fn play(&mut self) -> DailySnapshot {
        self.run("play", DailySequencer::play);
        self.snapshot()
    }

    pub fn stop(&mut self) -> DailySnapshot {
        self.run("stop", DailySequencer::stop);
        self.snapshot()
    }

    pub fn submit_guess(&mut self, raw: &str) -> GuessResult<DailySnapshot> {
        let transition = self.run("guess", |seq| seq.submit_guess(raw));
        GuessResult {
            verdict: transition.verdict,
            snapshot: self.snapshot(),
        }
    }

    pub fn skip(&mut self) -> DailySnapshot {
        self.run("skip", DailySequencer::skip);
        self.snapshot()
    }

    pub fn give_up(&mut self) -> DailySnapshot {
        self.run("give up", DailySequencer::give_up);
        self.snapshot()
    }

    pub fn start_reveal(&mut self) -> DailySnapshot {
        self.run("reveal", DailySequencer::start_reveal);
        self.snapshot()
    }

    pub fn stop_reveal(&mut self) -> DailySnapshot {
        self.run("stop reveal", DailySequencer::stop_reveal);
        self.snapshot()
    }

    /// Go to the next song of the day once the current round is over.
    pub fn advance(&mut self) -> DailySnapshot {
        let transition = self.run("advance", DailySequencer::advance);
        if !transition.ignored {
            let progress = self.sequencer.progress();
            if progress.completed() {
                info!(
                    date_key = %progress.playlist().date_key(),
                    rounds = progress.results().len(),
                    "daily challenge completed"
                );
            } else if let Some(song) = self.sequencer.session().current_song() {
                self.playback.load(song);
            }
        }
        self.snapshot()
    }

    /// Leave daily mode, cancelling any timer.
    pub fn abandon(&mut self) -> DailySnapshot {
        self.run("abandon", DailySequencer::abandon);
        self.snapshot()
    }

    pub async fn next_timer_event(&mut self) -> Option<TimerEvent> {
        self.events.recv().await
    }

    pub fn handle_timer(&mut self, event: TimerEvent) -> DailySnapshot {
        let transition = self.sequencer.on_timer(event);
        if !transition.ignored {
            self.playback.apply(&transition);
        }
        self.snapshot()
    }

    pub async fn pump(&mut self) -> Option<DailySnapshot> {
        let event = self.next_timer_event().await?;
        Some(self.handle_timer(event))
    }

    fn run(
        &mut self,
        command: &'static str,
        apply: impl FnOnce(&mut DailySequencer) -> Transition,
    ) -> Transition {
        let transition = apply(&mut self.sequencer);
        if transition.ignored {
            debug!(command, "daily command ignored");
        } else {
            self.playback.apply(&transition);
        }
        transition
    }
}
