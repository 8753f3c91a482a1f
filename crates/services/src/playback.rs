//! Carries out the effects of a session transition.
//!
//! `TimerDriver` turns a `TimerTicket` into a tokio task that sends a tick
//! every `TICK_INTERVAL` and, for bounded timers, one expiry. At most one task
//! is alive; starting or stopping aborts the previous one. Anything it already
//! queued still reaches the session, which drops it by generation.

use std::future;
use std::sync::Arc;

use guess_core::model::Song;
use guess_core::session::{Effect, Transition};
use guess_core::timer::{TICK_INTERVAL, TimerEvent, TimerTicket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::audio::{self, AudioDevice};

/// Wall-clock driver for the single timer slot.
#[derive(Debug)]
pub struct TimerDriver {
    events: mpsc::UnboundedSender<TimerEvent>,
    running: Option<JoinHandle<()>>,
}

impl TimerDriver {
    /// A driver and the receiving end of its events.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (
            Self {
                events,
                running: None,
            },
            receiver,
        )
    }

    /// Replace whatever is running with a task for `ticket`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, ticket: TimerTicket) {
        self.stop();
        debug!(
            generation = ticket.generation.value(),
            kind = ?ticket.kind,
            expires_after = ?ticket.expires_after,
            "timer started"
        );
        let events = self.events.clone();
        self.running = Some(tokio::spawn(run_timer(ticket, events)));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.running.take() {
            handle.abort();
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for TimerDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_timer(ticket: TimerTicket, events: mpsc::UnboundedSender<TimerEvent>) {
    let generation = ticket.generation;
    let mut ticks = time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let expiry = async {
        match ticket.expires_after {
            Some(after) => time::sleep(after).await,
            None => future::pending::<()>().await,
        }
    };
    tokio::pin!(expiry);

    loop {
        // A tick due at the same instant as the expiry is delivered first so
        // the elapsed count reaches the full exposure.
        tokio::select! {
            biased;
            _ = ticks.tick() => {
                trace!(generation = generation.value(), "timer tick");
                if events.send(TimerEvent::tick(generation)).is_err() {
                    return;
                }
            }
            () = &mut expiry => {
                debug!(generation = generation.value(), "timer expired");
                let _ = events.send(TimerEvent::expire(generation));
                return;
            }
        }
    }
}

/// Applies transition effects to an audio device and the timer driver.
pub struct Playback {
    audio: Arc<dyn AudioDevice>,
    timers: TimerDriver,
}

impl Playback {
    #[must_use]
    pub fn new(audio: Arc<dyn AudioDevice>) -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        let (timers, receiver) = TimerDriver::new();
        (Self { audio, timers }, receiver)
    }

    /// Point the device at `song`'s audio.
    pub fn load(&self, song: &Song) {
        audio::load(self.audio.as_ref(), song.audio_ref());
    }

    /// Perform every effect of `transition`, in order.
    pub fn apply(&mut self, transition: &Transition) {
        for effect in &transition.effects {
            match *effect {
                Effect::StartTimer(ticket) => self.timers.start(ticket),
                Effect::StopTimer(kind) => {
                    debug!(?kind, "timer stopped");
                    self.timers.stop();
                }
                Effect::Audio(command) => audio::perform(self.audio.as_ref(), command),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use guess_core::timer::{TimerKind, TimerSignal, TimerSlot};

    use super::*;

    async fn collect_until_expiry(
        receiver: &mut mpsc::UnboundedReceiver<TimerEvent>,
    ) -> Vec<TimerSignal> {
        let mut signals = Vec::new();
        while let Some(event) = receiver.recv().await {
            signals.push(event.signal);
            if event.signal == TimerSignal::Expire {
                break;
            }
        }
        signals
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_timer_ticks_then_expires_once() {
        let mut slot = TimerSlot::new();
        let ticket = slot.start(TimerKind::Exposure, Some(Duration::from_millis(500)));
        let (mut driver, mut receiver) = TimerDriver::new();
        driver.start(ticket);

        let signals = collect_until_expiry(&mut receiver).await;
        assert_eq!(
            signals,
            vec![
                TimerSignal::Tick,
                TimerSignal::Tick,
                TimerSignal::Tick,
                TimerSignal::Tick,
                TimerSignal::Tick,
                TimerSignal::Expire
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_abandons_the_previous_task() {
        let mut slot = TimerSlot::new();
        let first = slot.start(TimerKind::Exposure, Some(Duration::from_secs(10)));
        let (mut driver, mut receiver) = TimerDriver::new();
        driver.start(first);

        let second = slot.start(TimerKind::Exposure, Some(Duration::from_millis(200)));
        driver.start(second);

        while let Some(event) = receiver.recv().await {
            assert_eq!(event.generation, second.generation);
            if event.signal == TimerSignal::Expire {
                break;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_timer_keeps_ticking_until_stopped() {
        let mut slot = TimerSlot::new();
        let ticket = slot.start(TimerKind::Reveal, None);
        let (mut driver, mut receiver) = TimerDriver::new();
        driver.start(ticket);

        for _ in 0..30 {
            let event = receiver.recv().await.unwrap();
            assert_eq!(event.signal, TimerSignal::Tick);
        }
        driver.stop();
        assert!(!driver.is_running());
    }
}
