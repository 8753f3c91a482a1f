use thiserror::Error;

use crate::model::{DateKeyError, LadderError, SongError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Song(#[from] SongError),
    #[error(transparent)]
    DateKey(#[from] DateKeyError),
    #[error(transparent)]
    Ladder(#[from] LadderError),
}
