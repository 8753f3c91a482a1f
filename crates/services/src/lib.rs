#![forbid(unsafe_code)]

pub mod audio;
pub mod autocomplete;
pub mod daily;
pub mod error;
pub mod game;
pub mod playback;
pub mod selection;

pub use guess_core::Clock;

pub use audio::{AudioDevice, NullAudioDevice, RecordingAudioDevice};
pub use autocomplete::{Autocomplete, AutocompleteConfig, SuggestOutcome, Suggestion};
pub use daily::{DailyGame, DailyService};
pub use error::{AudioError, AutocompleteError, DailyError, GameError};
pub use game::{GameService, GuessResult};
pub use playback::{Playback, TimerDriver};
pub use selection::SongPicker;
