use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use guess_core::model::Song;

/// Uniform random choice of the next song in normal mode.
///
/// Seeded so a run can be replayed; the seed is logged by callers.
#[derive(Debug, Clone)]
pub struct SongPicker {
    seed: u64,
    rng: StdRng,
}

impl SongPicker {
    /// Picker seeded from the OS.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::with_seed(rand::rng().random())
    }

    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// One song chosen uniformly from `songs`, with replacement. `None` when empty.
    pub fn pick<'a>(&mut self, songs: &'a [Song]) -> Option<&'a Song> {
        if songs.is_empty() {
            return None;
        }
        let index = self.rng.random_range(0..songs.len());
        songs.get(index)
    }
}

impl Default for SongPicker {
    fn default() -> Self {
        Self::from_entropy()
    }
}
