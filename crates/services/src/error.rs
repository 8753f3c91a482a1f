//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;

/// Errors emitted by an `AudioDevice`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AudioError {
    #[error("audio device refused {command}: {reason}")]
    Refused {
        command: &'static str,
        reason: String,
    },
}

/// Errors emitted by `SuggestionProvider` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AutocompleteError {
    #[error("autocomplete request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `GameService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GameError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DailyService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DailyError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}
