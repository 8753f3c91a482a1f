use std::sync::Arc;

use guess_core::guess::GuessVerdict;
use guess_core::model::{ALL_CATEGORIES, Song, category_display_name};
use guess_core::session::{GameSession, SessionSnapshot, Transition};
use guess_core::timer::TimerEvent;
use storage::repository::CatalogRepository;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::audio::AudioDevice;
use crate::error::GameError;
use crate::playback::Playback;
use crate::selection::SongPicker;

/// Result of submitting a guess.
#[derive(Debug, Clone, PartialEq)]
pub struct GuessResult<S = SessionSnapshot> {
    /// `None` when the guess was ignored (no round, or round already over).
    pub verdict: Option<GuessVerdict>,
    pub snapshot: S,
}

/// Normal mode: random songs from a chosen category, one round at a time.
///
/// Owns the session, the audio device and the timer driver. Every command
/// applies its effects before returning the new snapshot.
pub struct GameService {
    catalog: Arc<dyn CatalogRepository>,
    session: GameSession,
    playback: Playback,
    events: mpsc::UnboundedReceiver<TimerEvent>,
    picker: SongPicker,
    category: Option<String>,
    candidates: Vec<Song>,
}

impl GameService {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        audio: Arc<dyn AudioDevice>,
        picker: SongPicker,
    ) -> Self {
        let (playback, events) = Playback::new(audio);
        Self {
            catalog,
            session: GameSession::default(),
            playback,
            events,
            picker,
            category: None,
            candidates: Vec::new(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &GameSession {
        &self.session
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Display name of the selected category, e.g. "Rock".
    #[must_use]
    pub fn category_name(&self) -> Option<String> {
        self.category.as_deref().map(category_display_name)
    }

    #[must_use]
    pub fn candidates(&self) -> &[Song] {
        &self.candidates
    }

    #[must_use]
    pub fn picker_seed(&self) -> u64 {
        self.picker.seed()
    }

    /// Reference for the audio element, without exposing the answer.
    #[must_use]
    pub fn audio_ref(&self) -> Option<&str> {
        self.session.current_song().map(Song::audio_ref)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Filter the catalog by `token` and load a random song from it.
    ///
    /// An empty category is selected but leaves the session without a song.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Storage` if the catalog cannot be read.
    pub async fn select_category(&mut self, token: &str) -> Result<SessionSnapshot, GameError> {
        let token = match token.trim() {
            "" => ALL_CATEGORIES,
            other => other,
        };
        let songs = self.catalog.songs_in_category(token).await?;
        info!(category = token, songs = songs.len(), "category selected");
        self.category = Some(token.to_string());
        self.candidates = songs;
        Ok(self.next_song())
    }

    /// Load another random song from the current category. With nothing to
    /// choose from, any round still loaded is dropped.
    pub fn next_song(&mut self) -> SessionSnapshot {
        let Some(song) = self.picker.pick(&self.candidates).cloned() else {
            warn!(category = ?self.category, "no songs to choose from");
            let transition = self.session.clear();
            self.playback.apply(&transition);
            return self.snapshot();
        };
        debug!(song_id = %song.id(), "song loaded");
        self.playback.load(&song);
        let transition = self.session.load_song(song);
        self.playback.apply(&transition);
        self.snapshot()
    }

    /// Back to category selection; cancels any running timer.
    pub fn leave_category(&mut self) -> SessionSnapshot {
        let transition = self.session.clear();
        self.playback.apply(&transition);
        if let Some(category) = self.category.take() {
            info!(category, "category left");
        }
        self.candidates.clear();
        self.snapshot()
    }

    pub fn play(&mut self) -> SessionSnapshot {
        self.run("play", GameSession::play);
        self.snapshot()
    }

    pub fn stop(&mut self) -> SessionSnapshot {
        self.run("stop", GameSession::stop);
        self.snapshot()
    }

    pub fn submit_guess(&mut self, raw: &str) -> GuessResult {
        let transition = self.run("guess", |session| session.submit_guess(raw));
        if let Some(verdict) = transition.verdict {
            info!(?verdict, "guess evaluated");
        }
        GuessResult {
            verdict: transition.verdict,
            snapshot: self.snapshot(),
        }
    }

    pub fn skip(&mut self) -> SessionSnapshot {
        self.run("skip", GameSession::skip);
        self.snapshot()
    }

    pub fn give_up(&mut self) -> SessionSnapshot {
        self.run("give up", GameSession::give_up);
        self.snapshot()
    }

    pub fn start_reveal(&mut self) -> SessionSnapshot {
        self.run("reveal", GameSession::start_reveal);
        self.snapshot()
    }

    pub fn stop_reveal(&mut self) -> SessionSnapshot {
        self.run("stop reveal", GameSession::stop_reveal);
        self.snapshot()
    }

    /// Wait for the next event from the timer driver.
    ///
    /// Pends forever while no timer has anything left to send.
    pub async fn next_timer_event(&mut self) -> Option<TimerEvent> {
        self.events.recv().await
    }

    pub fn handle_timer(&mut self, event: TimerEvent) -> SessionSnapshot {
        let transition = self.session.on_timer(event);
        if transition.ignored {
            debug!(generation = event.generation.value(), "stale timer event dropped");
        } else {
            self.playback.apply(&transition);
        }
        self.snapshot()
    }

    /// Receive and handle one timer event.
    pub async fn pump(&mut self) -> Option<SessionSnapshot> {
        let event = self.next_timer_event().await?;
        Some(self.handle_timer(event))
    }

    fn run(
        &mut self,
        command: &'static str,
        apply: impl FnOnce(&mut GameSession) -> Transition,
    ) -> Transition {
        let was_terminal = self.session.is_terminal();
        let transition = apply(&mut self.session);
        if transition.ignored {
            debug!(command, status = ?self.session.status(), "command ignored");
            return transition;
        }
        self.playback.apply(&transition);
        if !was_terminal && self.session.is_terminal() {
            info!(status = ?self.session.status(), "round finished");
        }
        transition
    }
}
