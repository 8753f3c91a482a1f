//! Generation-tagged timer bookkeeping.
//!
//! The slot does not run any clock itself. It hands out a `TimerTicket` that a
//! driver turns into real ticks and an expiry, and it decides which incoming
//! `TimerEvent`s still belong to the live timer. Every `start` issues a fresh
//! generation and every `stop` clears the active one, so an event that was
//! already queued when the timer was stopped or replaced is discarded on arrival.

use std::time::Duration;

use serde::Serialize;

/// Tick cadence shared by exposure and reveal timers.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Seconds accumulated per tick.
pub const TICK_SECONDS: f64 = 0.1;

/// Monotonic id for one `start` of the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimerGeneration(u64);

impl TimerGeneration {
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Which of the two mutually exclusive timers owns the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimerKind {
    /// Level-bounded snippet playback.
    Exposure,
    /// Unbounded post-round playback.
    Reveal,
}

/// Instructions for a driver: tick every `TICK_INTERVAL`, and fire a single
/// expiry after `expires_after` when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTicket {
    pub generation: TimerGeneration,
    pub kind: TimerKind,
    pub expires_after: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    Tick,
    Expire,
}

/// A tick or expiry as delivered by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEvent {
    pub generation: TimerGeneration,
    pub signal: TimerSignal,
}

impl TimerEvent {
    #[must_use]
    pub fn tick(generation: TimerGeneration) -> Self {
        Self {
            generation,
            signal: TimerSignal::Tick,
        }
    }

    #[must_use]
    pub fn expire(generation: TimerGeneration) -> Self {
        Self {
            generation,
            signal: TimerSignal::Expire,
        }
    }
}

/// Holds at most one live timer.
#[derive(Debug, Default, Clone)]
pub struct TimerSlot {
    issued: u64,
    active: Option<(TimerGeneration, TimerKind)>,
}

impl TimerSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a timer, replacing whatever was running.
    pub fn start(&mut self, kind: TimerKind, expires_after: Option<Duration>) -> TimerTicket {
        self.issued += 1;
        let generation = TimerGeneration(self.issued);
        self.active = Some((generation, kind));
        TimerTicket {
            generation,
            kind,
            expires_after,
        }
    }

    /// Stop the live timer, returning what it was.
    pub fn stop(&mut self) -> Option<TimerKind> {
        self.active.take().map(|(_, kind)| kind)
    }

    #[must_use]
    pub fn active_kind(&self) -> Option<TimerKind> {
        self.active.map(|(_, kind)| kind)
    }

    #[must_use]
    pub fn active_generation(&self) -> Option<TimerGeneration> {
        self.active.map(|(generation, _)| generation)
    }

    #[must_use]
    pub fn is_running(&self, kind: TimerKind) -> bool {
        self.active_kind() == Some(kind)
    }

    /// The kind of the live timer if `event` was issued under it; `None` for
    /// anything stale.
    #[must_use]
    pub fn accept(&self, event: TimerEvent) -> Option<TimerKind> {
        match self.active {
            Some((generation, kind)) if generation == event.generation => Some(kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_issues_increasing_generations() {
        let mut slot = TimerSlot::new();
        let a = slot.start(TimerKind::Exposure, Some(Duration::from_millis(200)));
        let b = slot.start(TimerKind::Exposure, None);
        assert!(b.generation > a.generation);
        assert_eq!(slot.active_generation(), Some(b.generation));
    }

    #[test]
    fn events_from_a_stopped_generation_are_discarded() {
        let mut slot = TimerSlot::new();
        let old = slot.start(TimerKind::Exposure, Some(Duration::from_secs(1)));
        assert_eq!(slot.stop(), Some(TimerKind::Exposure));
        let new = slot.start(TimerKind::Exposure, Some(Duration::from_secs(2)));

        assert_eq!(slot.accept(TimerEvent::tick(old.generation)), None);
        assert_eq!(slot.accept(TimerEvent::expire(old.generation)), None);
        assert_eq!(
            slot.accept(TimerEvent::tick(new.generation)),
            Some(TimerKind::Exposure)
        );
    }

    #[test]
    fn stop_without_restart_rejects_everything() {
        let mut slot = TimerSlot::new();
        let t = slot.start(TimerKind::Reveal, None);
        slot.stop();
        assert_eq!(slot.accept(TimerEvent::tick(t.generation)), None);
        assert_eq!(slot.stop(), None);
    }

    #[test]
    fn only_one_timer_is_live() {
        let mut slot = TimerSlot::new();
        slot.start(TimerKind::Exposure, Some(Duration::from_secs(1)));
        slot.start(TimerKind::Reveal, None);
        assert!(slot.is_running(TimerKind::Reveal));
        assert!(!slot.is_running(TimerKind::Exposure));
    }
}
