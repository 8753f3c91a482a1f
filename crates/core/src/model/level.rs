use serde::Serialize;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum LadderError {
    #[error("ladder must contain at least one level")]
    Empty,

    #[error("level {ordinal} has a non-positive or unbounded exposure ({seconds}s)")]
    InvalidExposure { ordinal: usize, seconds: f64 },

    #[error("level {ordinal} has a non-positive or unbounded display time ({seconds}s)")]
    InvalidDisplay { ordinal: usize, seconds: f64 },

    #[error("level {ordinal} is not longer than the level before it")]
    NotIncreasing { ordinal: usize },
}

//
// ─── LEVEL ─────────────────────────────────────────────────────────────────────
//

/// One rung of the exposure ladder.
///
/// `exposure_seconds` is how long audio actually plays; `display_seconds` is what
/// the player is told. The two differ on the shortest level, which plays 0.2s
/// of audio but is presented as 0.1s.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Level {
    ordinal: usize,
    label: String,
    exposure_seconds: f64,
    display_seconds: f64,
}

impl Level {
    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn exposure_seconds(&self) -> f64 {
        self.exposure_seconds
    }

    #[must_use]
    pub fn display_seconds(&self) -> f64 {
        self.display_seconds
    }

    /// Rescales real elapsed playback time into the value shown to the player.
    ///
    /// `min(elapsed * display / exposure, display)`; negative input clamps to zero.
    #[must_use]
    pub fn displayed_elapsed(&self, elapsed_seconds: f64) -> f64 {
        let scale = self.display_seconds / self.exposure_seconds;
        (elapsed_seconds.max(0.0) * scale).min(self.display_seconds)
    }
}

//
// ─── LADDER ────────────────────────────────────────────────────────────────────
//

/// (label, exposure, display) for the stock ladder.
const STANDARD_LEVELS: [(&str, f64, f64); 8] = [
    ("0.1s", 0.2, 0.1),
    ("0.5s", 0.5, 0.5),
    ("1s", 1.0, 1.0),
    ("2s", 2.0, 2.0),
    ("4s", 4.0, 4.0),
    ("8s", 8.0, 8.0),
    ("15s", 15.0, 15.0),
    ("30s", 30.0, 30.0),
];

/// Ordered, immutable sequence of exposure levels, shortest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelLadder {
    levels: Vec<Level>,
}

impl LevelLadder {
    /// The eight-level ladder used by both normal and daily play.
    #[must_use]
    pub fn standard() -> Self {
        let levels = STANDARD_LEVELS
            .iter()
            .enumerate()
            .map(|(ordinal, (label, exposure, display))| Level {
                ordinal,
                label: (*label).to_string(),
                exposure_seconds: *exposure,
                display_seconds: *display,
            })
            .collect();
        Self { levels }
    }

    /// Build a custom ladder from `(label, exposure, display)` triples.
    ///
    /// # Errors
    ///
    /// Returns `LadderError` if the ladder is empty, any duration is not positive,
    /// or exposures are not strictly increasing.
    pub fn from_levels<I, S>(levels: I) -> Result<Self, LadderError>
    where
        I: IntoIterator<Item = (S, f64, f64)>,
        S: Into<String>,
    {
        let mut built: Vec<Level> = Vec::new();
        for (ordinal, (label, exposure, display)) in levels.into_iter().enumerate() {
            if !(exposure.is_finite() && exposure > 0.0) {
                return Err(LadderError::InvalidExposure {
                    ordinal,
                    seconds: exposure,
                });
            }
            if !(display.is_finite() && display > 0.0) {
                return Err(LadderError::InvalidDisplay {
                    ordinal,
                    seconds: display,
                });
            }
            if built
                .last()
                .is_some_and(|prev| prev.exposure_seconds >= exposure)
            {
                return Err(LadderError::NotIncreasing { ordinal });
            }
            built.push(Level {
                ordinal,
                label: label.into(),
                exposure_seconds: exposure,
                display_seconds: display,
            });
        }

        if built.is_empty() {
            return Err(LadderError::Empty);
        }
        Ok(Self { levels: built })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always false for a constructed ladder; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    #[must_use]
    pub fn get(&self, ordinal: usize) -> Option<&Level> {
        self.levels.get(ordinal)
    }

    /// Level at `ordinal`, clamped to the last level.
    #[must_use]
    pub fn level(&self, ordinal: usize) -> &Level {
        let idx = ordinal.min(self.last_ordinal());
        &self.levels[idx]
    }

    #[must_use]
    pub fn last_ordinal(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// True when `ordinal` is the final rung (where "give up" is offered).
    #[must_use]
    pub fn is_last(&self, ordinal: usize) -> bool {
        ordinal == self.last_ordinal()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Level> {
        self.levels.iter()
    }
}

impl Default for LevelLadder {
    fn default() -> Self {
        Self::standard()
    }
}
