use super::*;
use crate::config::TrackDisplayField;
use std::path::PathBuf;
use std::time::Duration;

fn file(p: &str) -> MediaSource {
    MediaSource::File(PathBuf::from(p))
}

fn track(title: &str, artist: Option<&str>, album: Option<&str>, genre: Option<&str>) -> Track {
    Track {
        id: TrackId::from(title),
        title: title.into(),
        artist: artist.map(Into::into),
        album: album.map(Into::into),
        genre: genre.map(Into::into),
        duration: None,
        source: file("/tmp/x.mp3"),
        artwork: None,
        display: title.into(),
    }
}

#[test]
fn display_from_fields_can_format_artist_title() {
    let src = file("/tmp/Song.mp3");
    let fields = [TrackDisplayField::Artist, TrackDisplayField::Title];
    assert_eq!(
        display_from_fields(&src, "Song", Some("Artist"), None, &fields, " - "),
        "Artist - Song"
    );
    assert_eq!(
        display_from_fields(&src, "Song", Some("  Artist  "), None, &fields, " - "),
        "Artist - Song"
    );
    assert_eq!(
        display_from_fields(&src, "Song", None, None, &fields, " - "),
        "Song"
    );
}

#[test]
fn display_from_fields_uses_url_stem_for_filename() {
    let src = MediaSource::parse("http://host/uploads/songs/1700-track.mp3?x=1");
    assert_eq!(
        display_from_fields(&src, "T", None, None, &[TrackDisplayField::Filename], "/"),
        "1700-track"
    );
}

#[test]
fn media_source_parse_distinguishes_urls_and_paths() {
    assert_eq!(
        MediaSource::parse("https://example.com/a.mp3"),
        MediaSource::Url("https://example.com/a.mp3".into())
    );
    assert_eq!(
        MediaSource::parse("HTTP://example.com/a.mp3"),
        MediaSource::Url("HTTP://example.com/a.mp3".into())
    );
    assert_eq!(MediaSource::parse("/music/a.mp3"), file("/music/a.mp3"));
    assert_eq!(MediaSource::parse("relative/a.mp3"), file("relative/a.mp3"));
}

#[test]
fn track_matches_any_searchable_field_case_insensitively() {
    let t = track("Blackened", Some("Metallica"), Some("And Justice"), Some("Thrash"));
    assert!(t.matches("black"));
    assert!(t.matches("metal"));
    assert!(t.matches("justice"));
    assert!(t.matches("thrash"));
    assert!(t.matches(""));
    assert!(!t.matches("paranoid"));

    let bare = track("Solo", None, None, None);
    assert!(!bare.matches("metal"));
}

#[test]
fn format_duration_pads_seconds() {
    assert_eq!(format_duration(Duration::from_secs(0)), "0:00");
    assert_eq!(format_duration(Duration::from_secs(65)), "1:05");
    assert_eq!(format_duration(Duration::from_millis(599_900)), "9:59");
    assert_eq!(format_duration(Duration::from_secs(3600)), "60:00");
}
