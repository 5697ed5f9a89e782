use std::path::Path;
use std::time::Duration;

use lofty::prelude::*;
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::display::display_from_fields;
use super::model::{MediaSource, Track, TrackId};

/// Lowercased extensions from the settings, without leading dots.
fn wanted_extensions(settings: &LibrarySettings) -> Vec<String> {
    settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn has_extension(path: &Path, wanted: &[String]) -> bool {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => wanted.iter().any(|w| w.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

fn non_blank(v: Option<std::borrow::Cow<'_, str>>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Read one audio file into a `Track`, falling back to the file stem as title
/// when tags are missing or unreadable.
fn read_track(path: &Path, settings: &LibrarySettings) -> Track {
    let source = MediaSource::File(path.to_path_buf());
    let mut title = source.stem().unwrap_or_else(|| "UNKNOWN".to_string());
    let mut artist = None;
    let mut album = None;
    let mut genre = None;
    let mut duration: Option<Duration> = None;

    match lofty::read_from_path(path) {
        Ok(tagged) => {
            let d = tagged.properties().duration();
            if !d.is_zero() {
                duration = Some(d);
            }

            if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
                if let Some(t) = non_blank(tag.title()) {
                    title = t;
                }
                artist = non_blank(tag.artist());
                album = non_blank(tag.album());
                genre = non_blank(tag.genre());
            }
        }
        Err(e) => tracing::debug!(path = %path.display(), "no readable tags: {e}"),
    }

    let display = display_from_fields(
        &source,
        &title,
        artist.as_deref(),
        album.as_deref(),
        &settings.display_fields,
        &settings.display_separator,
    );

    Track {
        id: TrackId(path.display().to_string()),
        title,
        artist,
        album,
        genre,
        duration,
        source,
        artwork: None,
        display,
    }
}

/// Walk `dir` and collect every audio file as a `Track`, sorted by display
/// string (case-insensitive).
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    let mut tracks: Vec<Track> = Vec::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    let wanted = wanted_extensions(settings);
    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path.is_file() && has_extension(path, &wanted) {
            tracks.push(read_track(path, settings));
        }
    }

    tracks.sort_by(|a, b| a.display.to_lowercase().cmp(&b.display.to_lowercase()));
    tracks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackDisplayField;
    use std::fs;
    use tempfile::tempdir;

    fn by_filename() -> LibrarySettings {
        LibrarySettings {
            display_fields: vec![TrackDisplayField::Filename],
            ..LibrarySettings::default()
        }
    }

    fn touch(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"not real audio").unwrap();
    }

    fn names(tracks: &[Track]) -> Vec<&str> {
        tracks.iter().map(|t| t.display.as_str()).collect()
    }

    #[test]
    fn extensions_are_normalized_once() {
        let settings = LibrarySettings {
            extensions: vec![".MP3".into(), " flac ".into(), String::new()],
            ..LibrarySettings::default()
        };
        let wanted = wanted_extensions(&settings);
        assert_eq!(wanted, vec!["mp3".to_string(), "flac".to_string()]);

        assert!(has_extension(Path::new("/m/a.Mp3"), &wanted));
        assert!(has_extension(Path::new("/m/a.FLAC"), &wanted));
        assert!(!has_extension(Path::new("/m/a.ogg"), &wanted));
        assert!(!has_extension(Path::new("/m/mp3"), &wanted));
    }

    #[test]
    fn untagged_files_become_tracks_keyed_by_path() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "zeta.ogg");
        touch(dir.path(), "Alpha.WAV");
        touch(dir.path(), "cover.jpg");

        let settings = LibrarySettings {
            display_fields: vec![TrackDisplayField::Title],
            ..LibrarySettings::default()
        };
        let tracks = scan(dir.path(), &settings);

        assert_eq!(names(&tracks), vec!["Alpha", "zeta"]);
        let first = &tracks[0];
        assert_eq!(first.title, "Alpha");
        assert_eq!(first.artist, None);
        assert_eq!(first.genre, None);
        assert!(first.duration.is_none());
        assert_eq!(
            first.id.as_str(),
            dir.path().join("Alpha.WAV").display().to_string()
        );
        assert_eq!(
            first.source,
            MediaSource::File(dir.path().join("Alpha.WAV"))
        );
    }

    #[test]
    fn hidden_entries_are_skipped_on_request() {
        let dir = tempdir().unwrap();
        touch(dir.path(), ".secret.mp3");
        touch(dir.path(), ".cache/inside.mp3");
        touch(dir.path(), "shown.mp3");

        assert_eq!(scan(dir.path(), &by_filename()).len(), 3);

        let settings = LibrarySettings {
            include_hidden: false,
            ..by_filename()
        };
        assert_eq!(names(&scan(dir.path(), &settings)), vec!["shown"]);
    }

    #[test]
    fn depth_limits_apply() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "top.mp3");
        touch(dir.path(), "a/mid.mp3");
        touch(dir.path(), "a/b/deep.mp3");

        let flat = LibrarySettings {
            recursive: false,
            ..by_filename()
        };
        assert_eq!(names(&scan(dir.path(), &flat)), vec!["top"]);

        // The root itself is depth 0.
        let two = LibrarySettings {
            max_depth: Some(2),
            ..by_filename()
        };
        assert_eq!(names(&scan(dir.path(), &two)), vec!["mid", "top"]);

        assert_eq!(scan(dir.path(), &by_filename()).len(), 3);
    }
}
