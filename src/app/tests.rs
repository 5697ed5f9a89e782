use super::*;
use crate::catalog::{CatalogView, PlaylistSummary};
use crate::library::{MediaSource, Track, TrackId};
use crate::player::{Notification, PlaybackError, PlayerState, RepeatMode, VolumeTier};
use std::path::PathBuf;
use std::time::{Duration, Instant};

fn t(title: &str) -> Track {
    Track {
        id: TrackId::from(title),
        title: title.into(),
        artist: None,
        album: None,
        genre: None,
        duration: Some(Duration::from_secs(90)),
        source: MediaSource::File(PathBuf::from(format!("/music/{title}.mp3"))),
        artwork: None,
        display: title.into(),
    }
}

fn app_with(titles: &[&str]) -> App {
    let mut app = App::new("~/Music".into(), Duration::from_millis(300));
    let tracks = titles.iter().map(|s| t(s)).collect();
    app.apply(
        &Notification::PlaylistReplaced {
            tracks,
            current_index: None,
        },
        Instant::now(),
    );
    app
}

#[test]
fn track_change_moves_cursor_when_following() {
    let mut app = app_with(&["Alpha", "Beta", "Gamma"]);
    let changed = app.apply(
        &Notification::TrackChanged {
            index: 2,
            track: t("Gamma"),
        },
        Instant::now(),
    );
    assert!(changed);
    assert_eq!(app.selected, 2);
    assert_eq!(app.current_index, Some(2));
    assert_eq!(app.duration, Some(90.0));
    assert_eq!(app.now_playing.as_ref().map(|t| t.title.as_str()), Some("Gamma"));
}

#[test]
fn free_roam_keeps_cursor_in_place() {
    let mut app = app_with(&["Alpha", "Beta", "Gamma"]);
    app.next();
    app.follow_playback_off();

    app.apply(
        &Notification::TrackChanged {
            index: 2,
            track: t("Gamma"),
        },
        Instant::now(),
    );
    assert_eq!(app.selected, 1);

    app.follow_playback_on();
    assert_eq!(app.selected, 2);
}

#[test]
fn next_prev_wrap_around() {
    let mut app = app_with(&["Alpha", "Beta", "Gamma"]);
    app.prev();
    assert_eq!(app.selected, 2);
    app.next();
    assert_eq!(app.selected, 0);

    app.select_last();
    assert_eq!(app.selected, 2);
    app.select_first();
    assert_eq!(app.selected, 0);
}

#[test]
fn playlist_replacement_clamps_selection() {
    let mut app = app_with(&["Alpha", "Beta", "Gamma"]);
    app.select_last();
    app.follow_playback_off();

    app.apply(
        &Notification::PlaylistReplaced {
            tracks: vec![t("Beta")],
            current_index: None,
        },
        Instant::now(),
    );
    assert_eq!(app.selected, 0);
    assert_eq!(app.tracks.len(), 1);

    app.apply(
        &Notification::PlaylistReplaced {
            tracks: Vec::new(),
            current_index: None,
        },
        Instant::now(),
    );
    assert_eq!(app.selected, 0);
    assert!(!app.has_tracks());
}

#[test]
fn search_is_sent_after_quiet_period() {
    let mut app = app_with(&["Alpha"]);
    let t0 = Instant::now();
    app.enter_search_mode();
    assert!(!app.follow_playback);

    app.push_search_char('b', t0);
    app.push_search_char('e', t0 + Duration::from_millis(200));
    assert_eq!(app.take_due_search(t0 + Duration::from_millis(400)), None);
    assert_eq!(
        app.take_due_search(t0 + Duration::from_millis(500)),
        Some("be".to_string())
    );
    assert_eq!(app.take_due_search(t0 + Duration::from_secs(2)), None);
}

#[test]
fn clearing_search_requests_full_list_immediately() {
    let mut app = app_with(&["Alpha"]);
    let now = Instant::now();
    app.enter_search_mode();
    app.push_search_char('x', now);

    app.clear_search(now);
    assert!(!app.search_mode);
    assert_eq!(app.take_due_search(now), Some(String::new()));
}

#[test]
fn backspace_on_empty_query_does_not_search() {
    let mut app = app_with(&["Alpha"]);
    let now = Instant::now();
    app.pop_search_char(now);
    assert_eq!(app.take_due_search(now + Duration::from_secs(1)), None);
}

#[test]
fn errors_expire_from_the_status_line() {
    let mut app = app_with(&["Alpha"]);
    let now = Instant::now();
    app.apply(&Notification::Error(PlaybackError::EmptyPlaylist), now);

    assert_eq!(app.error_line(now), Some("playlist is empty"));
    assert_eq!(app.error_line(now + ERROR_TTL), None);
}

#[test]
fn mode_and_volume_notifications_are_mirrored() {
    let mut app = app_with(&["Alpha"]);
    let now = Instant::now();

    app.apply(&Notification::ShuffleChanged(true), now);
    app.apply(&Notification::RepeatChanged(RepeatMode::RepeatOne), now);
    app.apply(
        &Notification::VolumeChanged {
            volume: 0.3,
            tier: VolumeTier::Low,
        },
        now,
    );
    let state_changed = app.apply(
        &Notification::StateChanged {
            phase: PlayerState::Playing,
            is_playing: true,
        },
        now,
    );

    assert!(app.shuffle);
    assert_eq!(app.repeat, RepeatMode::RepeatOne);
    assert_eq!(app.volume_tier, VolumeTier::Low);
    assert!(state_changed);
    assert_eq!(app.phase, PlayerState::Playing);
}

#[test]
fn progress_resets_on_track_change() {
    let mut app = app_with(&["Alpha", "Beta"]);
    let now = Instant::now();
    app.apply(
        &Notification::Progress {
            elapsed: 45.0,
            duration: Some(90.0),
            fraction: 0.5,
        },
        now,
    );
    assert_eq!(app.progress, 0.5);
    assert_eq!(app.elapsed, 45.0);

    app.apply(
        &Notification::TrackChanged {
            index: 1,
            track: t("Beta"),
        },
        now,
    );
    assert_eq!(app.progress, 0.0);
    assert_eq!(app.elapsed, 0.0);
}

fn playlist(id: &str, name: &str) -> PlaylistSummary {
    PlaylistSummary {
        id: id.into(),
        name: name.into(),
        description: None,
    }
}

#[test]
fn views_cycle_through_collections() {
    let mut app = app_with(&["Alpha"]);
    assert_eq!(app.next_view(), CatalogView::Library);

    app.collections = true;
    app.playlists = vec![playlist("3", "Road trip"), playlist("1", "Focus")];

    let mut seen = Vec::new();
    for _ in 0..4 {
        let next = app.next_view();
        app.set_view(next);
        seen.push(app.view.label().to_string());
    }
    assert_eq!(seen, vec!["Favorites", "Road trip", "Focus", "Library"]);

    // A playlist that disappeared on reload falls back to the library.
    app.view = CatalogView::Playlist(playlist("9", "Gone"));
    assert_eq!(app.next_view(), CatalogView::Library);
}

#[test]
fn switching_view_drops_pending_search() {
    let mut app = app_with(&["Alpha"]);
    let now = Instant::now();
    app.enter_search_mode();
    app.push_search_char('a', now);

    app.set_view(CatalogView::Favorites);
    assert!(app.search_query.is_empty());
    assert!(!app.search_mode);
    assert!(app.catalog_busy);
    assert_eq!(app.take_due_search(now + Duration::from_secs(1)), None);
}
