//! Line-oriented terminal driver for normal and daily mode.

use std::fmt::{self, Write as _};
use std::io;

use guess_core::daily::DailySnapshot;
use guess_core::guess::GuessVerdict;
use guess_core::session::{SessionSnapshot, SessionStatus};
use services::autocomplete::SuggestOutcome;
use services::{Autocomplete, DailyGame, GameError, GameService};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCommand {
    Play,
    Stop,
    Skip,
    Guess(String),
    GiveUp,
    Reveal,
    StopReveal,
    Next,
    Category(String),
    Back,
    Suggest(String),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    Empty,
    MissingArgument { command: &'static str },
    Unknown(String),
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineError::Empty => write!(f, "type a command, or `help`"),
            LineError::MissingArgument { command } => write!(f, "{command} needs an argument"),
            LineError::Unknown(word) => write!(f, "unknown command: {word} (try `help`)"),
        }
    }
}

impl std::error::Error for LineError {}

impl LineCommand {
    pub fn parse(line: &str) -> Result<Self, LineError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let argument = |command: &'static str| {
            if rest.is_empty() {
                Err(LineError::MissingArgument { command })
            } else {
                Ok(rest.to_string())
            }
        };

        match word.to_ascii_lowercase().as_str() {
            "" => Err(LineError::Empty),
            "play" | "p" => Ok(Self::Play),
            "stop" | "s" => Ok(Self::Stop),
            "skip" => Ok(Self::Skip),
            "guess" | "g" => argument("guess").map(Self::Guess),
            "giveup" | "give-up" => Ok(Self::GiveUp),
            "reveal" => Ok(Self::Reveal),
            "unreveal" => Ok(Self::StopReveal),
            "next" | "n" => Ok(Self::Next),
            "category" | "c" => argument("category").map(Self::Category),
            "back" => Ok(Self::Back),
            "suggest" => argument("suggest").map(Self::Suggest),
            "status" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            other => Err(LineError::Unknown(other.to_string())),
        }
    }
}

pub fn help_text() -> &'static str {
    "Commands:
  play | stop | skip | giveup
  guess <title> - <artist>
  reveal | unreveal
  next                 next song (daily: next song of the day)
  category <token>     all, pop, rock, ...
  back                 leave the category
  suggest <query>      look up title/artist suggestions
  status | help | quit"
}

fn status_label(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Empty => "no song loaded",
        SessionStatus::Idle => "ready",
        SessionStatus::Playing => "playing",
        SessionStatus::AwaitingGuess => "waiting for a guess",
        SessionStatus::Correct => "correct!",
        SessionStatus::GaveUp => "gave up",
        SessionStatus::Exhausted => "out of levels",
    }
}

pub fn render_session(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "Level {}/{} [{}] {:.2}s / {:.2}s | {}",
        snapshot.level_index + 1,
        snapshot.level_count,
        snapshot.level_label,
        snapshot.displayed_elapsed,
        snapshot.display_seconds,
        status_label(snapshot.status)
    );
    for attempt in &snapshot.attempts {
        let mark = if attempt.verdict.is_correct() { "+" } else { "x" };
        let _ = write!(out, "\n  {mark} {}", attempt.raw_text);
        if attempt.artist_partial_match {
            out.push_str(" (artist matches)");
        }
    }
    if snapshot.give_up_offered {
        out.push_str("\n  last level: `giveup` to see the answer");
    }
    if let Some(song) = &snapshot.revealed {
        let _ = write!(out, "\nAnswer: {} - {}", song.title, song.artist);
    }
    if snapshot.reveal_playing {
        let _ = write!(out, "\nReveal playing {:.1}s", snapshot.reveal_elapsed);
    }
    out
}

pub fn render_daily(snapshot: &DailySnapshot) -> String {
    let mut out = format!("Daily {}", snapshot.date_key);
    if let Some(label) = &snapshot.category_label {
        let _ = write!(out, " ({label})");
    }
    let _ = write!(
        out,
        " | song {}/{}",
        snapshot.song_index + 1,
        snapshot.song_count
    );
    out.push('\n');
    out.push_str(&render_session(&snapshot.session));
    if snapshot.completed {
        let solved = snapshot
            .results
            .iter()
            .filter(|r| r.outcome == guess_core::session::Outcome::Correct)
            .count();
        let _ = write!(
            out,
            "\nDay complete: {solved}/{} guessed",
            snapshot.results.len()
        );
    }
    out
}

fn render_verdict(verdict: Option<GuessVerdict>) {
    match verdict {
        Some(GuessVerdict::Correct) => println!("Correct!"),
        Some(GuessVerdict::Wrong) => println!("Wrong."),
        None => {}
    }
}

fn render_suggestions(outcome: &SuggestOutcome) {
    match outcome {
        SuggestOutcome::TooShort => println!("type at least 3 characters"),
        SuggestOutcome::Superseded => {}
        SuggestOutcome::Suggestions(found) if found.is_empty() => println!("no suggestions"),
        SuggestOutcome::Suggestions(found) => {
            for suggestion in found {
                println!("  guess {}", suggestion.guess_text());
            }
        }
    }
}

/// Autocomplete lookups run on their own tasks so the input loop keeps
/// handling timer events while one is outstanding.
pub struct SuggestionFeed {
    autocomplete: Autocomplete,
    sender: mpsc::UnboundedSender<SuggestOutcome>,
    receiver: mpsc::UnboundedReceiver<SuggestOutcome>,
}

impl SuggestionFeed {
    pub fn new(autocomplete: Autocomplete) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            autocomplete,
            sender,
            receiver,
        }
    }

    /// Start a lookup for `query`; its outcome arrives through `next`.
    pub fn request(&self, query: String) {
        let autocomplete = self.autocomplete.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let outcome = autocomplete.suggest(&query).await;
            let _ = sender.send(outcome);
        });
    }

    /// Next finished lookup. Superseded lookups are skipped.
    pub async fn next(&mut self) -> Option<SuggestOutcome> {
        loop {
            match self.receiver.recv().await? {
                SuggestOutcome::Superseded => {}
                outcome => return Some(outcome),
            }
        }
    }
}

/// Normal mode until `quit` or end of input.
///
/// # Errors
///
/// Returns an error if stdin fails or the catalog cannot be re-read.
pub async fn run_normal(
    mut game: GameService,
    autocomplete: Autocomplete,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut suggestions = SuggestionFeed::new(autocomplete);
    if let Some(name) = game.category_name() {
        println!("Category: {name}");
    }
    println!("{}", render_session(&game.snapshot()));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match LineCommand::parse(&line) {
                    Ok(LineCommand::Quit) => break,
                    Ok(command) => normal_command(&mut game, &suggestions, command).await?,
                    Err(err) => println!("{err}"),
                }
            }
            Some(event) = game.next_timer_event() => {
                let before = game.snapshot().status;
                let snapshot = game.handle_timer(event);
                if snapshot.status != before {
                    println!("{}", render_session(&snapshot));
                }
            }
            Some(outcome) = suggestions.next() => render_suggestions(&outcome),
        }
    }

    game.leave_category();
    Ok(())
}

async fn normal_command(
    game: &mut GameService,
    suggestions: &SuggestionFeed,
    command: LineCommand,
) -> Result<(), GameError> {
    let snapshot = match command {
        LineCommand::Play => game.play(),
        LineCommand::Stop => game.stop(),
        LineCommand::Skip => game.skip(),
        LineCommand::GiveUp => game.give_up(),
        LineCommand::Guess(text) => {
            let result = game.submit_guess(&text);
            render_verdict(result.verdict);
            result.snapshot
        }
        LineCommand::Reveal => game.start_reveal(),
        LineCommand::StopReveal => game.stop_reveal(),
        LineCommand::Next => game.next_song(),
        LineCommand::Category(token) => {
            let snapshot = game.select_category(&token).await?;
            if let Some(name) = game.category_name() {
                println!("Category: {name} ({} songs)", game.candidates().len());
            }
            snapshot
        }
        LineCommand::Back => {
            game.leave_category();
            println!("Pick a category with `category <token>`.");
            return Ok(());
        }
        LineCommand::Suggest(query) => {
            suggestions.request(query);
            return Ok(());
        }
        LineCommand::Status => game.snapshot(),
        LineCommand::Help => {
            println!("{}", help_text());
            return Ok(());
        }
        LineCommand::Quit => return Ok(()),
    };
    println!("{}", render_session(&snapshot));
    Ok(())
}

/// Daily mode until `quit` or end of input.
///
/// # Errors
///
/// Returns an error if stdin fails.
pub async fn run_daily(mut game: DailyGame, autocomplete: Autocomplete) -> io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut suggestions = SuggestionFeed::new(autocomplete);
    println!("{}", render_daily(&game.snapshot()));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match LineCommand::parse(&line) {
                    Ok(LineCommand::Quit) => break,
                    Ok(command) => daily_command(&mut game, &suggestions, command),
                    Err(err) => println!("{err}"),
                }
            }
            Some(event) = game.next_timer_event() => {
                let before = game.snapshot().session.status;
                let snapshot = game.handle_timer(event);
                if snapshot.session.status != before {
                    println!("{}", render_daily(&snapshot));
                }
            }
            Some(outcome) = suggestions.next() => render_suggestions(&outcome),
        }
    }

    game.abandon();
    Ok(())
}

fn daily_command(game: &mut DailyGame, suggestions: &SuggestionFeed, command: LineCommand) {
    let snapshot = match command {
        LineCommand::Play => game.play(),
        LineCommand::Stop => game.stop(),
        LineCommand::Skip => game.skip(),
        LineCommand::GiveUp => game.give_up(),
        LineCommand::Guess(text) => {
            let result = game.submit_guess(&text);
            render_verdict(result.verdict);
            result.snapshot
        }
        LineCommand::Reveal => game.start_reveal(),
        LineCommand::StopReveal => game.stop_reveal(),
        LineCommand::Next => game.advance(),
        LineCommand::Category(_) | LineCommand::Back => {
            println!("categories are not used in daily mode");
            return;
        }
        LineCommand::Suggest(query) => {
            suggestions.request(query);
            return;
        }
        LineCommand::Status => game.snapshot(),
        LineCommand::Help => {
            println!("{}", help_text());
            return;
        }
        LineCommand::Quit => return,
    };
    println!("{}", render_daily(&snapshot));
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use guess_core::model::{DailyCalendar, LevelLadder, Song, SongId};
    use guess_core::session::GameSession;
    use services::autocomplete::SuggestionProvider;
    use services::{AutocompleteError, Suggestion};

    use super::*;

    #[test]
    fn parses_commands_and_arguments() {
        assert_eq!(LineCommand::parse(" PLAY "), Ok(LineCommand::Play));
        assert_eq!(
            LineCommand::parse("guess Billie Jean - Michael Jackson"),
            Ok(LineCommand::Guess("Billie Jean - Michael Jackson".into()))
        );
        assert_eq!(
            LineCommand::parse("category rock"),
            Ok(LineCommand::Category("rock".into()))
        );
        assert_eq!(
            LineCommand::parse("guess"),
            Err(LineError::MissingArgument { command: "guess" })
        );
        assert_eq!(LineCommand::parse(""), Err(LineError::Empty));
        assert!(matches!(
            LineCommand::parse("dance"),
            Err(LineError::Unknown(_))
        ));
    }

    #[test]
    fn render_hides_answer_until_round_is_over() {
        let song = Song::new(SongId::new(1), "Yesterday", "The Beatles", "/y.mp3").unwrap();
        let mut session = GameSession::new(LevelLadder::standard());
        session.load_song(song);
        session.submit_guess("Help - the beatles");

        let text = render_session(&session.snapshot());
        assert!(text.starts_with("Level 2/8 [0.5s]"));
        assert!(text.contains("x Help - the beatles (artist matches)"));
        assert!(!text.contains("Answer:"));

        session.give_up();
        assert!(render_session(&session.snapshot()).contains("Answer: Yesterday - The Beatles"));
    }

    struct SlowProvider;

    #[async_trait]
    impl SuggestionProvider for SlowProvider {
        async fn search(&self, query: &str) -> Result<Vec<Suggestion>, AutocompleteError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec![Suggestion {
                title: query.to_string(),
                artist: "Queen".into(),
            }])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pending_lookup_does_not_hold_up_timers() {
        let autocomplete = Autocomplete::new(Some(Arc::new(SlowProvider) as Arc<dyn SuggestionProvider>));
        let mut feed = SuggestionFeed::new(autocomplete);
        feed.request("radio".into());

        let song = Song::new(SongId::new(1), "Radio Ga Ga", "Queen", "/r.mp3").unwrap();
        let repo = storage::repository::InMemoryRepository::with_catalog(
            vec![song.with_categories(["rock"])],
            DailyCalendar::new(),
        );
        let mut game = GameService::new(
            Arc::new(repo),
            Arc::new(services::NullAudioDevice),
            services::SongPicker::with_seed(1),
        );
        game.select_category("rock").await.unwrap();
        game.play();

        let status = loop {
            tokio::select! {
                Some(event) = game.next_timer_event() => {
                    let snapshot = game.handle_timer(event);
                    if snapshot.status != SessionStatus::Playing {
                        break snapshot.status;
                    }
                }
                Some(_) = feed.next() => panic!("lookup finished before the level expired"),
            }
        };
        assert_eq!(status, SessionStatus::AwaitingGuess);

        match feed.next().await {
            Some(SuggestOutcome::Suggestions(found)) => assert_eq!(found[0].title, "radio"),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_lookups_are_not_surfaced() {
        let autocomplete = Autocomplete::new(Some(Arc::new(SlowProvider) as Arc<dyn SuggestionProvider>));
        let mut feed = SuggestionFeed::new(autocomplete);
        feed.request("rad".into());
        tokio::task::yield_now().await;
        feed.request("radio".into());

        match feed.next().await {
            Some(SuggestOutcome::Suggestions(found)) => assert_eq!(found[0].title, "radio"),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
