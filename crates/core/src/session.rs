use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::guess::{GuessAttempt, GuessVerdict, evaluate_guess};
use crate::model::{LevelLadder, Song};
use crate::timer::{TICK_SECONDS, TimerEvent, TimerKind, TimerSignal, TimerSlot, TimerTicket};

//
// ─── OUTCOME & PHASE ───────────────────────────────────────────────────────────
//

/// How a round ended, or that it has not ended yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    InProgress,
    Correct,
    GaveUp,
    Exhausted,
}

impl Outcome {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Outcome::InProgress)
    }
}

/// Exposure state of a round that is still in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// Ready to play the current level.
    Idle,
    /// Exposure timer running.
    Playing,
    /// Current level was played and stopped.
    AwaitingGuess,
}

/// Single view of where the session is, derived from phase and outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    /// No song loaded.
    Empty,
    Idle,
    Playing,
    AwaitingGuess,
    Correct,
    GaveUp,
    Exhausted,
}

impl SessionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Correct | SessionStatus::GaveUp | SessionStatus::Exhausted
        )
    }
}

//
// ─── EFFECTS ───────────────────────────────────────────────────────────────────
//

/// Commands for the audio device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCommand {
    Play,
    Pause,
    SeekToStart,
}

/// Side effects a driver must carry out, in order, after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    StartTimer(TimerTicket),
    StopTimer(TimerKind),
    Audio(AudioCommand),
}

/// Result of feeding one command or timer event into the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    pub effects: Vec<Effect>,
    /// Set by guess submission when the guess was evaluated.
    pub verdict: Option<GuessVerdict>,
    /// The command did not apply in the current state and changed nothing.
    pub ignored: bool,
}

impl Transition {
    #[must_use]
    pub fn ignored() -> Self {
        Self {
            ignored: true,
            ..Self::default()
        }
    }

    fn applied(effects: Vec<Effect>) -> Self {
        Self {
            effects,
            verdict: None,
            ignored: false,
        }
    }
}

//
// ─── ROUND STATE ───────────────────────────────────────────────────────────────
//

/// Post-round full playback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevealPlayback {
    playing: bool,
    ticks: u32,
}

impl RevealPlayback {
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> f64 {
        f64::from(self.ticks) * TICK_SECONDS
    }
}

/// Everything that belongs to one round. Replaced wholesale on `load_song`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    song: Song,
    level_index: usize,
    elapsed_ticks: u32,
    outcome: Outcome,
    phase: Phase,
    attempts: Vec<GuessAttempt>,
    reveal: RevealPlayback,
}

impl SessionState {
    #[must_use]
    pub fn new(song: Song) -> Self {
        Self {
            song,
            level_index: 0,
            elapsed_ticks: 0,
            outcome: Outcome::InProgress,
            phase: Phase::Idle,
            attempts: Vec::new(),
            reveal: RevealPlayback::default(),
        }
    }

    #[must_use]
    pub fn song(&self) -> &Song {
        &self.song
    }

    #[must_use]
    pub fn level_index(&self) -> usize {
        self.level_index
    }

    /// Seconds of audio played at the current level.
    #[must_use]
    pub fn elapsed_seconds(&self) -> f64 {
        f64::from(self.elapsed_ticks) * TICK_SECONDS
    }

    #[must_use]
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn attempts(&self) -> &[GuessAttempt] {
        &self.attempts
    }

    #[must_use]
    pub fn reveal(&self) -> &RevealPlayback {
        &self.reveal
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        match (self.outcome, self.phase) {
            (Outcome::Correct, _) => SessionStatus::Correct,
            (Outcome::GaveUp, _) => SessionStatus::GaveUp,
            (Outcome::Exhausted, _) => SessionStatus::Exhausted,
            (Outcome::InProgress, Phase::Idle) => SessionStatus::Idle,
            (Outcome::InProgress, Phase::Playing) => SessionStatus::Playing,
            (Outcome::InProgress, Phase::AwaitingGuess) => SessionStatus::AwaitingGuess,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_terminal()
    }
}

//
// ─── SNAPSHOT ──────────────────────────────────────────────────────────────────
//

/// Answer details, only exposed once the round is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevealedSong {
    pub title: String,
    pub artist: String,
    pub cover_ref: Option<String>,
}

/// Everything a UI needs to render the round without timing state of its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub level_index: usize,
    pub level_count: usize,
    pub level_label: String,
    pub display_seconds: f64,
    pub displayed_elapsed: f64,
    pub attempts: Vec<GuessAttempt>,
    pub give_up_offered: bool,
    pub revealed: Option<RevealedSong>,
    pub reveal_available: bool,
    pub reveal_playing: bool,
    pub reveal_elapsed: f64,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// The round state machine.
///
/// Commands return a `Transition` listing effects (timer and audio) for a
/// driver to perform. Terminal rounds ignore everything except `load_song`,
/// `clear` and reveal playback.
pub struct GameSession {
    ladder: LevelLadder,
    timers: TimerSlot,
    round: Option<SessionState>,
}

impl GameSession {
    #[must_use]
    pub fn new(ladder: LevelLadder) -> Self {
        Self {
            ladder,
            timers: TimerSlot::new(),
            round: None,
        }
    }

    #[must_use]
    pub fn ladder(&self) -> &LevelLadder {
        &self.ladder
    }

    #[must_use]
    pub fn round(&self) -> Option<&SessionState> {
        self.round.as_ref()
    }

    #[must_use]
    pub fn current_song(&self) -> Option<&Song> {
        self.round.as_ref().map(SessionState::song)
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.round
            .as_ref()
            .map_or(SessionStatus::Empty, SessionState::status)
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    #[must_use]
    pub fn active_timer(&self) -> Option<TimerKind> {
        self.timers.active_kind()
    }

    /// Start a fresh round for `song`, cancelling any running timer.
    pub fn load_song(&mut self, song: Song) -> Transition {
        let mut effects = Vec::new();
        self.halt_timer(&mut effects);
        effects.push(Effect::Audio(AudioCommand::Pause));
        effects.push(Effect::Audio(AudioCommand::SeekToStart));
        self.round = Some(SessionState::new(song));
        Transition::applied(effects)
    }

    /// Drop the current round entirely.
    pub fn clear(&mut self) -> Transition {
        let mut effects = Vec::new();
        if self.halt_timer(&mut effects).is_some() {
            effects.push(Effect::Audio(AudioCommand::Pause));
        }
        if self.round.take().is_none() && effects.is_empty() {
            return Transition::ignored();
        }
        Transition::applied(effects)
    }

    /// Play the current level from the start.
    pub fn play(&mut self) -> Transition {
        let Some(round) = self.round.as_mut() else {
            return Transition::ignored();
        };
        if round.is_terminal() || round.phase == Phase::Playing {
            return Transition::ignored();
        }

        let level = self.ladder.level(round.level_index);
        let expires_after = Duration::from_secs_f64(level.exposure_seconds());
        let ticket = self.timers.start(TimerKind::Exposure, Some(expires_after));
        round.elapsed_ticks = 0;
        round.phase = Phase::Playing;

        Transition::applied(vec![
            Effect::StartTimer(ticket),
            Effect::Audio(AudioCommand::SeekToStart),
            Effect::Audio(AudioCommand::Play),
        ])
    }

    /// Stop the exposure early.
    pub fn stop(&mut self) -> Transition {
        if !self
            .round
            .as_ref()
            .is_some_and(|r| !r.is_terminal() && r.phase == Phase::Playing)
        {
            return Transition::ignored();
        }
        let mut effects = Vec::new();
        self.halt_exposure(&mut effects);
        if let Some(round) = self.round.as_mut() {
            round.phase = Phase::AwaitingGuess;
        }
        Transition::applied(effects)
    }

    /// Feed a tick or expiry from the driver. Stale generations are dropped.
    pub fn on_timer(&mut self, event: TimerEvent) -> Transition {
        let Some(kind) = self.timers.accept(event) else {
            return Transition::ignored();
        };
        let Some(round) = self.round.as_mut() else {
            return Transition::ignored();
        };

        match (kind, event.signal) {
            (TimerKind::Exposure, TimerSignal::Tick) => {
                round.elapsed_ticks = round.elapsed_ticks.saturating_add(1);
                Transition::applied(Vec::new())
            }
            (TimerKind::Exposure, TimerSignal::Expire) => {
                round.phase = Phase::AwaitingGuess;
                let mut effects = Vec::new();
                self.halt_exposure(&mut effects);
                Transition::applied(effects)
            }
            (TimerKind::Reveal, TimerSignal::Tick) => {
                round.reveal.ticks = round.reveal.ticks.saturating_add(1);
                Transition::applied(Vec::new())
            }
            (TimerKind::Reveal, TimerSignal::Expire) => Transition::ignored(),
        }
    }

    /// Evaluate a guess. A wrong guess consumes the level exactly like `skip`.
    pub fn submit_guess(&mut self, raw: &str) -> Transition {
        let Some(round) = self.round.as_mut() else {
            return Transition::ignored();
        };
        if round.is_terminal() {
            return Transition::ignored();
        }

        let attempt = evaluate_guess(raw, &round.song);
        let verdict = attempt.verdict;
        round.attempts.push(attempt);

        let mut transition = match verdict {
            GuessVerdict::Correct => {
                let mut effects = Vec::new();
                self.halt_exposure(&mut effects);
                self.finish(Outcome::Correct);
                Transition::applied(effects)
            }
            GuessVerdict::Wrong => self.advance_level(),
        };
        transition.verdict = Some(verdict);
        transition
    }

    /// Move to the next, longer level, or end the round on the last one.
    pub fn skip(&mut self) -> Transition {
        if !self.round.as_ref().is_some_and(|r| !r.is_terminal()) {
            return Transition::ignored();
        }
        self.advance_level()
    }

    /// End the round at any level.
    pub fn give_up(&mut self) -> Transition {
        if !self.round.as_ref().is_some_and(|r| !r.is_terminal()) {
            return Transition::ignored();
        }
        let mut effects = Vec::new();
        self.halt_exposure(&mut effects);
        self.finish(Outcome::GaveUp);
        Transition::applied(effects)
    }

    /// Play the whole song from the beginning. Only after the round is over.
    pub fn start_reveal(&mut self) -> Transition {
        if !self.round.as_ref().is_some_and(SessionState::is_terminal) {
            return Transition::ignored();
        }
        let mut effects = Vec::new();
        self.halt_timer(&mut effects);
        let ticket = self.timers.start(TimerKind::Reveal, None);
        if let Some(round) = self.round.as_mut() {
            round.reveal = RevealPlayback {
                playing: true,
                ticks: 0,
            };
        }
        effects.push(Effect::StartTimer(ticket));
        effects.push(Effect::Audio(AudioCommand::SeekToStart));
        effects.push(Effect::Audio(AudioCommand::Play));
        Transition::applied(effects)
    }

    pub fn stop_reveal(&mut self) -> Transition {
        if !self.timers.is_running(TimerKind::Reveal) {
            return Transition::ignored();
        }
        let mut effects = Vec::new();
        self.halt_timer(&mut effects);
        effects.push(Effect::Audio(AudioCommand::Pause));
        if let Some(round) = self.round.as_mut() {
            round.reveal.playing = false;
        }
        Transition::applied(effects)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let Some(round) = self.round.as_ref() else {
            let level = self.ladder.level(0);
            return SessionSnapshot {
                status: SessionStatus::Empty,
                level_index: 0,
                level_count: self.ladder.len(),
                level_label: level.label().to_string(),
                display_seconds: level.display_seconds(),
                displayed_elapsed: 0.0,
                attempts: Vec::new(),
                give_up_offered: false,
                revealed: None,
                reveal_available: false,
                reveal_playing: false,
                reveal_elapsed: 0.0,
            };
        };

        let level = self.ladder.level(round.level_index);
        let terminal = round.is_terminal();
        SessionSnapshot {
            status: round.status(),
            level_index: round.level_index,
            level_count: self.ladder.len(),
            level_label: level.label().to_string(),
            display_seconds: level.display_seconds(),
            displayed_elapsed: level.displayed_elapsed(round.elapsed_seconds()),
            attempts: round.attempts.clone(),
            give_up_offered: !terminal && self.ladder.is_last(round.level_index),
            revealed: terminal.then(|| RevealedSong {
                title: round.song.title().to_string(),
                artist: round.song.artist().to_string(),
                cover_ref: round.song.cover_ref().map(str::to_string),
            }),
            reveal_available: terminal,
            reveal_playing: round.reveal.playing,
            reveal_elapsed: round.reveal.elapsed_seconds(),
        }
    }

    fn advance_level(&mut self) -> Transition {
        let mut effects = Vec::new();
        self.halt_exposure(&mut effects);
        let last = self.ladder.last_ordinal();
        let at_last = self.round.as_ref().is_some_and(|r| r.level_index >= last);
        if at_last {
            self.finish(Outcome::Exhausted);
        } else if let Some(round) = self.round.as_mut() {
            round.level_index += 1;
            round.elapsed_ticks = 0;
            round.phase = Phase::Idle;
        }
        Transition::applied(effects)
    }

    fn finish(&mut self, outcome: Outcome) {
        if let Some(round) = self.round.as_mut() {
            round.outcome = outcome;
            round.phase = Phase::Idle;
        }
    }

    /// Stop the exposure timer (if live) and silence the device.
    fn halt_exposure(&mut self, effects: &mut Vec<Effect>) {
        if self.timers.is_running(TimerKind::Exposure) {
            self.halt_timer(effects);
            effects.push(Effect::Audio(AudioCommand::Pause));
            effects.push(Effect::Audio(AudioCommand::SeekToStart));
        }
    }

    fn halt_timer(&mut self, effects: &mut Vec<Effect>) -> Option<TimerKind> {
        let stopped = self.timers.stop();
        if let Some(kind) = stopped {
            effects.push(Effect::StopTimer(kind));
            if kind == TimerKind::Reveal {
                if let Some(round) = self.round.as_mut() {
                    round.reveal.playing = false;
                }
            }
        }
        stopped
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(LevelLadder::standard())
    }
}

impl fmt::Debug for GameSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSession")
            .field("levels", &self.ladder.len())
            .field("status", &self.status())
            .field("level_index", &self.round.as_ref().map(SessionState::level_index))
            .field("active_timer", &self.timers.active_kind())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
