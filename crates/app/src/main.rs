use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use guess_core::model::{ALL_CATEGORIES, DateKey};
use guess_core::time::{DEFAULT_REFERENCE_OFFSET_MINUTES, ReferenceZone};
use services::autocomplete::SuggestOutcome;
use services::{Autocomplete, Clock, DailyService, GameService, NullAudioDevice, SongPicker};
use storage::repository::Storage;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod console;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidSeed { raw: String },
    InvalidDate { raw: String },
    InvalidTzOffset { raw: String },
    MissingQuery,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidSeed { raw } => write!(f, "invalid seed: {raw}"),
            ArgsError::InvalidDate { raw } => write!(f, "invalid --date value (YYYY-MM-DD): {raw}"),
            ArgsError::InvalidTzOffset { raw } => {
                write!(f, "invalid time zone offset in minutes: {raw}")
            }
            ArgsError::MissingQuery => write!(f, "suggest requires a query"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play    [--catalog <path>] [--category <token>] [--seed <n>]");
    eprintln!("  cargo run -p app -- daily   [--catalog <path>] [--calendar <path>] [--date <YYYY-MM-DD>] [--tz-offset <minutes>]");
    eprintln!("  cargo run -p app -- suggest <query...>");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --catalog data/songs.json");
    eprintln!("  --calendar data/daily.json");
    eprintln!("  --category all");
    eprintln!("  --tz-offset {DEFAULT_REFERENCE_OFFSET_MINUTES}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  GUESS_CATALOG, GUESS_CALENDAR, GUESS_SEED, GUESS_TZ_OFFSET_MINUTES");
    eprintln!("  GUESS_AUTOCOMPLETE_URL, GUESS_AUTOCOMPLETE_LIMIT, GUESS_AUTOCOMPLETE_DISABLED");
    eprintln!("  RUST_LOG (default: info)");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Daily,
    Suggest,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "daily" => Some(Self::Daily),
            "suggest" => Some(Self::Suggest),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    catalog: PathBuf,
    calendar: PathBuf,
    category: String,
    seed: Option<u64>,
    date: Option<DateKey>,
    zone: ReferenceZone,
    query: Vec<String>,
}

fn parse_seed(raw: String) -> Result<u64, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidSeed { raw })
}

fn parse_zone(raw: String) -> Result<ReferenceZone, ArgsError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .and_then(ReferenceZone::from_offset_minutes)
        .ok_or(ArgsError::InvalidTzOffset { raw })
}

impl Args {
    fn from_env() -> Result<Self, ArgsError> {
        let catalog = std::env::var("GUESS_CATALOG")
            .map_or_else(|_| PathBuf::from("data/songs.json"), PathBuf::from);
        let calendar = std::env::var("GUESS_CALENDAR")
            .map_or_else(|_| PathBuf::from("data/daily.json"), PathBuf::from);
        let seed = std::env::var("GUESS_SEED").ok().map(parse_seed).transpose()?;
        let zone = std::env::var("GUESS_TZ_OFFSET_MINUTES")
            .ok()
            .map(parse_zone)
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            catalog,
            calendar,
            category: ALL_CATEGORIES.to_string(),
            seed,
            date: None,
            zone,
            query: Vec::new(),
        })
    }

    fn parse(cmd: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::from_env()?;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--catalog" => parsed.catalog = PathBuf::from(require_value(args, "--catalog")?),
                "--calendar" => {
                    parsed.calendar = PathBuf::from(require_value(args, "--calendar")?);
                }
                "--category" if cmd == Command::Play => {
                    parsed.category = require_value(args, "--category")?;
                }
                "--seed" if cmd == Command::Play => {
                    parsed.seed = Some(parse_seed(require_value(args, "--seed")?)?);
                }
                "--date" if cmd == Command::Daily => {
                    let value = require_value(args, "--date")?;
                    let key = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidDate { raw: value.clone() })?;
                    parsed.date = Some(key);
                }
                "--tz-offset" if cmd == Command::Daily => {
                    parsed.zone = parse_zone(require_value(args, "--tz-offset")?)?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ if cmd == Command::Suggest && !arg.starts_with("--") => parsed.query.push(arg),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if cmd == Command::Suggest && parsed.query.is_empty() {
            return Err(ArgsError::MissingQuery);
        }
        Ok(parsed)
    }

    fn load_storage(&self) -> Result<Storage, storage::repository::StorageError> {
        let calendar = self.calendar.exists().then_some(self.calendar.as_path());
        Storage::from_json_files(&self.catalog, calendar)
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: normal mode when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();

    match cmd {
        Command::Play => {
            let storage = parsed.load_storage()?;
            let picker = parsed
                .seed
                .map_or_else(SongPicker::from_entropy, SongPicker::with_seed);
            info!(seed = picker.seed(), catalog = %parsed.catalog.display(), "starting normal mode");

            let mut game = GameService::new(storage.catalog, Arc::new(NullAudioDevice), picker);
            game.select_category(&parsed.category).await?;
            console::run_normal(game, Autocomplete::from_env()).await
        }
        Command::Daily => {
            let storage = parsed.load_storage()?;
            let service =
                DailyService::new(Clock::default_clock(), parsed.zone, storage.calendar);
            let availability = match parsed.date {
                Some(key) => service.availability(key).await?,
                None => service.today().await?,
            };
            let key = availability.date_key();
            let Some(playlist) = availability.into_playlist() else {
                println!("No daily challenge for {key}.");
                return Ok(());
            };
            let game = service.start(playlist, Arc::new(NullAudioDevice));
            console::run_daily(game, Autocomplete::from_env()).await?;
            Ok(())
        }
        Command::Suggest => {
            let query = parsed.query.join(" ");
            let autocomplete = Autocomplete::from_env().with_debounce(Duration::ZERO);
            if !autocomplete.enabled() {
                println!("autocomplete is disabled");
                return Ok(());
            }
            match autocomplete.suggest(&query).await {
                SuggestOutcome::TooShort => println!("type at least 3 characters"),
                SuggestOutcome::Superseded => {}
                SuggestOutcome::Suggestions(found) => {
                    for suggestion in found {
                        println!("{}", suggestion.guess_text());
                    }
                }
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(cmd: Command, args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(cmd, &mut iter)
    }

    #[test]
    fn play_flags_override_defaults() {
        let args = parse(Command::Play, &["--category", "rock", "--seed", "9"]).unwrap();
        assert_eq!(args.category, "rock");
        assert_eq!(args.seed, Some(9));
    }

    #[test]
    fn daily_flags_are_validated() {
        let args = parse(Command::Daily, &["--date", "2026-10-19", "--tz-offset", "-300"]).unwrap();
        assert_eq!(args.date.map(|d| d.to_string()).as_deref(), Some("2026-10-19"));
        assert_eq!(args.zone.offset().local_minus_utc(), -300 * 60);

        assert!(matches!(
            parse(Command::Daily, &["--date", "19/10/2026"]),
            Err(ArgsError::InvalidDate { .. })
        ));
        assert!(matches!(
            parse(Command::Daily, &["--tz-offset", "99999"]),
            Err(ArgsError::InvalidTzOffset { .. })
        ));
    }

    #[test]
    fn mode_specific_flags_are_rejected_elsewhere() {
        assert!(matches!(
            parse(Command::Daily, &["--seed", "1"]),
            Err(ArgsError::UnknownArg(_))
        ));
        assert!(matches!(
            parse(Command::Play, &["--category"]),
            Err(ArgsError::MissingValue { flag: "--category" })
        ));
    }

    #[test]
    fn suggest_collects_query_words() {
        let args = parse(Command::Suggest, &["billie", "jean"]).unwrap();
        assert_eq!(args.query.join(" "), "billie jean");
        assert!(matches!(
            parse(Command::Suggest, &[]),
            Err(ArgsError::MissingQuery)
        ));
    }
}
