//! Audio output seam.
//!
//! The game never waits on audio: a device that refuses a command is logged
//! and the round keeps running on its own timer.

use std::sync::{Arc, Mutex};

use guess_core::session::AudioCommand;
use tracing::{debug, warn};

use crate::error::AudioError;

/// Something that can play one song's audio from a reference.
pub trait AudioDevice: Send + Sync {
    /// Bind the device to a new source. Called whenever a song is loaded.
    ///
    /// # Errors
    ///
    /// Returns `AudioError` if the source cannot be opened.
    fn load(&self, audio_ref: &str) -> Result<(), AudioError>;

    /// # Errors
    ///
    /// Returns `AudioError` if playback cannot start (e.g. autoplay restrictions).
    fn play(&self) -> Result<(), AudioError>;

    /// # Errors
    ///
    /// Returns `AudioError` if the device cannot pause.
    fn pause(&self) -> Result<(), AudioError>;

    /// # Errors
    ///
    /// Returns `AudioError` if the device cannot seek.
    fn seek_to_start(&self) -> Result<(), AudioError>;
}

/// Run one command against `device`, logging instead of failing.
pub(crate) fn perform(device: &dyn AudioDevice, command: AudioCommand) {
    let result = match command {
        AudioCommand::Play => device.play(),
        AudioCommand::Pause => device.pause(),
        AudioCommand::SeekToStart => device.seek_to_start(),
    };
    if let Err(err) = result {
        warn!(?command, error = %err, "audio command failed");
    }
}

pub(crate) fn load(device: &dyn AudioDevice, audio_ref: &str) {
    if let Err(err) = device.load(audio_ref) {
        warn!(audio_ref, error = %err, "audio source failed to load");
    }
}

/// Device that only logs what it was asked to do.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudioDevice;

impl AudioDevice for NullAudioDevice {
    fn load(&self, audio_ref: &str) -> Result<(), AudioError> {
        debug!(audio_ref, "audio load");
        Ok(())
    }

    fn play(&self) -> Result<(), AudioError> {
        debug!("audio play");
        Ok(())
    }

    fn pause(&self) -> Result<(), AudioError> {
        debug!("audio pause");
        Ok(())
    }

    fn seek_to_start(&self) -> Result<(), AudioError> {
        debug!("audio seek to start");
        Ok(())
    }
}

/// One call recorded by `RecordingAudioDevice`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCall {
    Load(String),
    Command(AudioCommand),
}

/// Device that remembers every call, for tests and dry runs.
///
/// With `refuse_play` set, `play` fails the way a browser blocks autoplay.
#[derive(Debug, Clone, Default)]
pub struct RecordingAudioDevice {
    calls: Arc<Mutex<Vec<AudioCall>>>,
    refuse_play: bool,
}

impl RecordingAudioDevice {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn refusing_play() -> Self {
        Self {
            refuse_play: true,
            ..Self::default()
        }
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<AudioCall> {
        self.calls
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Only the transport commands, without loads.
    #[must_use]
    pub fn commands(&self) -> Vec<AudioCommand> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                AudioCall::Command(command) => Some(command),
                AudioCall::Load(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.calls.lock() {
            guard.clear();
        }
    }

    fn record(&self, call: AudioCall) {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push(call);
        }
    }
}

impl AudioDevice for RecordingAudioDevice {
    fn load(&self, audio_ref: &str) -> Result<(), AudioError> {
        self.record(AudioCall::Load(audio_ref.to_string()));
        Ok(())
    }

    fn play(&self) -> Result<(), AudioError> {
        self.record(AudioCall::Command(AudioCommand::Play));
        if self.refuse_play {
            return Err(AudioError::Refused {
                command: "play",
                reason: "playback not allowed".into(),
            });
        }
        Ok(())
    }

    fn pause(&self) -> Result<(), AudioError> {
        self.record(AudioCall::Command(AudioCommand::Pause));
        Ok(())
    }

    fn seek_to_start(&self) -> Result<(), AudioError> {
        self.record(AudioCall::Command(AudioCommand::SeekToStart));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_play_is_swallowed() {
        let device = RecordingAudioDevice::refusing_play();
        perform(&device, AudioCommand::SeekToStart);
        perform(&device, AudioCommand::Play);
        assert_eq!(
            device.commands(),
            vec![AudioCommand::SeekToStart, AudioCommand::Play]
        );
    }

    #[test]
    fn load_is_recorded_separately_from_commands() {
        let device = RecordingAudioDevice::new();
        load(&device, "/audio/a.mp3");
        perform(&device, AudioCommand::Pause);
        assert_eq!(
            device.calls(),
            vec![
                AudioCall::Load("/audio/a.mp3".into()),
                AudioCall::Command(AudioCommand::Pause)
            ]
        );
        assert_eq!(device.commands(), vec![AudioCommand::Pause]);
    }
}
