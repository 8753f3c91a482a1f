use std::path::PathBuf;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use guess_core::daily::DailyAvailability;
use guess_core::session::SessionStatus;
use guess_core::time::ReferenceZone;
use services::{Clock, DailyService, NullAudioDevice};
use storage::repository::Storage;

fn storage() -> Storage {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data");
    Storage::from_json_files(root.join("songs.json"), Some(root.join("daily.json").as_path()))
        .expect("load data files")
}

fn service_at(hour: u32, day: u32) -> DailyService {
    let at = Utc.with_ymd_and_hms(2026, 10, day, hour, 30, 0).unwrap();
    DailyService::new(Clock::fixed(at), ReferenceZone::default(), storage().calendar)
}

#[tokio::test]
async fn late_evening_utc_is_already_tomorrow_in_reference_zone() {
    // 23:30 UTC on the 19th is 00:30 on the 20th at UTC+1.
    let service = service_at(23, 19);
    assert_eq!(service.today_key().to_string(), "2026-10-20");

    let playlist = service.today().await.unwrap().into_playlist().unwrap();
    assert_eq!(playlist.len(), 1);
    assert_eq!(playlist.category_label(), Some("90s"));
}

#[tokio::test]
async fn day_without_entry_is_unavailable() {
    let service = service_at(12, 25);
    assert!(matches!(
        service.today().await.unwrap(),
        DailyAvailability::Unavailable { .. }
    ));
}

#[tokio::test]
async fn full_day_played_through() {
    let service = service_at(12, 19);
    let playlist = service.today().await.unwrap().into_playlist().unwrap();
    let mut game = service.start(playlist, Arc::new(NullAudioDevice));

    let first = game.snapshot();
    assert_eq!(first.song_count, 3);
    assert_eq!(first.category_label.as_deref(), Some("80s"));

    let correct = game.submit_guess("Billie Jean - Michael Jackson");
    assert_eq!(correct.snapshot.session.status, SessionStatus::Correct);
    game.advance();

    game.give_up();
    game.advance();

    let third = game.submit_guess("yesterday - the beatles");
    assert_eq!(third.snapshot.session.status, SessionStatus::Correct);
    let done = game.advance();

    assert!(done.completed);
    assert_eq!(done.results.len(), 3);
    assert!(game.start_reveal().session.reveal_playing);
}
