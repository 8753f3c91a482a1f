//! Free-text guess parsing and matching.
//!
//! Guesses are written as `"<title> - <artist>"`. The artist part is optional.
//! Nothing is ever rejected: a blank or artist-less guess simply evaluates as
//! wrong.

use serde::{Deserialize, Serialize};

use crate::model::Song;

/// Separator between title and artist in a guess.
pub const GUESS_SEPARATOR: &str = " - ";

/// Result of comparing a guess with the target song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuessVerdict {
    Correct,
    Wrong,
}

impl GuessVerdict {
    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, GuessVerdict::Correct)
    }
}

/// Normalized title/artist pair extracted from raw guess text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedGuess {
    pub title: String,
    pub artist: String,
}

impl ParsedGuess {
    /// Split on the first `" - "`, then trim and lower-case both sides.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let (title, artist) = raw.split_once(GUESS_SEPARATOR).unwrap_or((raw, ""));
        Self {
            title: normalize(title),
            artist: normalize(artist),
        }
    }
}

/// One submitted guess, as recorded in the round history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessAttempt {
    pub raw_text: String,
    pub parsed_title: String,
    pub parsed_artist: String,
    /// Guessed artist is non-empty and contained in the real artist.
    /// Feedback only; never affects scoring.
    pub artist_partial_match: bool,
    pub verdict: GuessVerdict,
}

/// Evaluate `raw` against `song`.
///
/// Correct only when both the normalized title and normalized artist match
/// exactly.
#[must_use]
pub fn evaluate_guess(raw: &str, song: &Song) -> GuessAttempt {
    let parsed = ParsedGuess::parse(raw);
    let title = normalize(song.title());
    let artist = normalize(song.artist());

    let verdict = if parsed.title == title && parsed.artist == artist {
        GuessVerdict::Correct
    } else {
        GuessVerdict::Wrong
    };
    let artist_partial_match = verdict == GuessVerdict::Wrong
        && !parsed.artist.is_empty()
        && artist.contains(&parsed.artist);

    GuessAttempt {
        raw_text: raw.to_string(),
        parsed_title: parsed.title,
        parsed_artist: parsed.artist,
        artist_partial_match,
        verdict,
    }
}

/// Text the guess field should hold after the player picks a suggestion.
#[must_use]
pub fn format_guess(title: &str, artist: &str) -> String {
    format!("{title}{GUESS_SEPARATOR}{artist}")
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SongId;

    fn song(title: &str, artist: &str) -> Song {
        Song::new(SongId::new(1), title, artist, "/songs/x.mp3").unwrap()
    }

    #[test]
    fn exact_match_ignores_case_and_whitespace() {
        let target = song("Shape Of You", "Ed Sheeran");
        assert!(evaluate_guess("Shape Of You - Ed Sheeran", &target).verdict.is_correct());
        assert!(
            evaluate_guess("  shape of you -   ed sheeran  ", &target)
                .verdict
                .is_correct()
        );
    }

    #[test]
    fn title_only_guess_is_wrong_without_partial_match() {
        let target = song("Yesterday", "The Beatles");
        let attempt = evaluate_guess("yesterday", &target);
        assert_eq!(attempt.verdict, GuessVerdict::Wrong);
        assert_eq!(attempt.parsed_title, "yesterday");
        assert_eq!(attempt.parsed_artist, "");
        assert!(!attempt.artist_partial_match);
    }

    #[test]
    fn partial_artist_is_flagged_on_wrong_guess() {
        let target = song("Yesterday", "The Beatles");
        let attempt = evaluate_guess("Let It Be - beatles", &target);
        assert_eq!(attempt.verdict, GuessVerdict::Wrong);
        assert!(attempt.artist_partial_match);

        let miss = evaluate_guess("Yesterday - Stones", &target);
        assert!(!miss.artist_partial_match);
    }

    #[test]
    fn splits_on_first_separator_only() {
        let parsed = ParsedGuess::parse("Title - Artist - Remix");
        assert_eq!(parsed.title, "title");
        assert_eq!(parsed.artist, "artist - remix");
    }

    #[test]
    fn blank_and_malformed_input_is_evaluated_not_rejected() {
        let target = song("Yesterday", "The Beatles");
        let blank = evaluate_guess("", &target);
        assert_eq!(blank.verdict, GuessVerdict::Wrong);
        assert_eq!(blank.raw_text, "");

        // A hyphen without surrounding spaces is part of the title.
        let hyphen = evaluate_guess("Yesterday-The Beatles", &target);
        assert_eq!(hyphen.parsed_artist, "");
        assert_eq!(hyphen.verdict, GuessVerdict::Wrong);
    }

    #[test]
    fn formatted_suggestion_round_trips_through_the_parser() {
        let target = song("Bohemian Rhapsody", "Queen");
        let text = format_guess("Bohemian Rhapsody", "Queen");
        assert_eq!(text, "Bohemian Rhapsody - Queen");
        assert!(evaluate_guess(&text, &target).verdict.is_correct());
    }
}
