//! Application model: the TUI's view of the playlist and of the controller.
//!
//! `App` never drives playback itself. It mirrors what the controller
//! publishes (see [`App::apply`]) and keeps purely presentational state:
//! the cursor, the search input and the transient error line.

use std::time::{Duration, Instant};

use crate::catalog::{CatalogView, PlaylistSummary};
use crate::library::Track;
use crate::player::{Notification, PlayerState, RepeatMode, VolumeTier};

/// How long an error stays in the status box.
pub const ERROR_TTL: Duration = Duration::from_secs(5);

/// The main application model.
pub struct App {
    pub tracks: Vec<Track>,
    pub selected: usize,

    pub now_playing: Option<Track>,
    pub current_index: Option<usize>,
    pub phase: PlayerState,
    pub is_playing: bool,
    pub elapsed: f64,
    pub duration: Option<f64>,
    /// `elapsed / duration` in `[0, 1]`, as published.
    pub progress: f64,
    pub volume: f32,
    pub volume_tier: VolumeTier,
    pub shuffle: bool,
    pub repeat: RepeatMode,

    pub follow_playback: bool,

    pub search_mode: bool,
    pub search_query: String,
    search_debounce: Duration,
    search_due: Option<Instant>,

    /// A catalog fetch is in flight.
    pub catalog_busy: bool,
    /// Where tracks come from, e.g. a directory or server URL.
    pub catalog_label: String,
    /// The catalog keeps favorites and playlists.
    pub collections: bool,
    pub view: CatalogView,
    pub playlists: Vec<PlaylistSummary>,

    error: Option<(String, Instant)>,
}

impl App {
    pub fn new(catalog_label: String, search_debounce: Duration) -> Self {
        Self {
            tracks: Vec::new(),
            selected: 0,

            now_playing: None,
            current_index: None,
            phase: PlayerState::Idle,
            is_playing: false,
            elapsed: 0.0,
            duration: None,
            progress: 0.0,
            volume: 0.0,
            volume_tier: VolumeTier::Muted,
            shuffle: false,
            repeat: RepeatMode::Off,

            follow_playback: true,

            search_mode: false,
            search_query: String::new(),
            search_debounce,
            search_due: None,

            catalog_busy: false,
            catalog_label,
            collections: false,
            view: CatalogView::Library,
            playlists: Vec::new(),

            error: None,
        }
    }

    /// Mirror a controller notification.
    ///
    /// Returns true when the now-playing track or play state changed, which
    /// is what MPRIS cares about.
    pub fn apply(&mut self, n: &Notification, now: Instant) -> bool {
        match n {
            Notification::TrackChanged { index, track } => {
                self.now_playing = Some(track.clone());
                self.current_index = Some(*index);
                self.elapsed = 0.0;
                self.progress = 0.0;
                self.duration = track.duration.map(|d| d.as_secs_f64());
                if self.follow_playback && !self.search_mode && *index < self.tracks.len() {
                    self.selected = *index;
                }
                true
            }
            Notification::StateChanged { phase, is_playing } => {
                self.phase = *phase;
                self.is_playing = *is_playing;
                true
            }
            Notification::Progress {
                elapsed,
                duration,
                fraction,
            } => {
                self.elapsed = *elapsed;
                self.duration = *duration;
                self.progress = *fraction;
                false
            }
            Notification::VolumeChanged { volume, tier } => {
                self.volume = *volume;
                self.volume_tier = *tier;
                false
            }
            Notification::ShuffleChanged(on) => {
                self.shuffle = *on;
                false
            }
            Notification::RepeatChanged(mode) => {
                self.repeat = *mode;
                false
            }
            Notification::PlaylistReplaced {
                tracks,
                current_index,
            } => {
                self.tracks = tracks.clone();
                self.current_index = *current_index;
                self.catalog_busy = false;
                match current_index {
                    Some(i) if self.follow_playback => self.selected = *i,
                    _ => self.selected = self.selected.min(self.tracks.len().saturating_sub(1)),
                }
                false
            }
            Notification::Error(e) => {
                self.show_error(e.to_string(), now);
                false
            }
        }
    }

    pub fn has_tracks(&self) -> bool {
        !self.tracks.is_empty()
    }

    pub fn show_error(&mut self, message: String, now: Instant) {
        self.error = Some((message, now));
    }

    /// The most recent error, while it is younger than [`ERROR_TTL`].
    pub fn error_line(&self, now: Instant) -> Option<&str> {
        self.error
            .as_ref()
            .filter(|(_, at)| now.saturating_duration_since(*at) < ERROR_TTL)
            .map(|(msg, _)| msg.as_str())
    }

    pub fn follow_playback_on(&mut self) {
        self.follow_playback = true;
        if let Some(i) = self.current_index {
            self.selected = i;
        }
    }

    pub fn follow_playback_off(&mut self) {
        self.follow_playback = false;
    }

    /// Move selection to the next track, wrapping around.
    pub fn next(&mut self) {
        if self.has_tracks() {
            self.selected = (self.selected + 1) % self.tracks.len();
        }
    }

    /// Move selection to the previous track, wrapping around.
    pub fn prev(&mut self) {
        if self.has_tracks() {
            let len = self.tracks.len();
            self.selected = (self.selected + len - 1) % len;
        }
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.tracks.len().saturating_sub(1);
    }

    /// The view after the current one: library, favorites, then each
    /// playlist, wrapping around. Only the library without collections.
    pub fn next_view(&self) -> CatalogView {
        if !self.collections {
            return CatalogView::Library;
        }
        let mut views = vec![CatalogView::Library, CatalogView::Favorites];
        views.extend(self.playlists.iter().cloned().map(CatalogView::Playlist));

        match views.iter().position(|v| *v == self.view) {
            Some(i) => views[(i + 1) % views.len()].clone(),
            None => CatalogView::Library,
        }
    }

    /// Switch collections; a query typed for the old view is dropped.
    pub fn set_view(&mut self, view: CatalogView) {
        self.view = view;
        self.search_query.clear();
        self.search_mode = false;
        self.search_due = None;
        self.catalog_busy = true;
    }

    pub fn enter_search_mode(&mut self) {
        self.search_mode = true;
        self.follow_playback_off();
    }

    /// Leave the input, keeping the current results.
    pub fn exit_search_mode(&mut self) {
        self.search_mode = false;
    }

    /// Drop the query and ask for the full list right away.
    pub fn clear_search(&mut self, now: Instant) {
        self.search_query.clear();
        self.search_mode = false;
        self.search_due = Some(now);
    }

    pub fn push_search_char(&mut self, c: char, now: Instant) {
        self.search_query.push(c);
        self.search_due = Some(now + self.search_debounce);
    }

    pub fn pop_search_char(&mut self, now: Instant) {
        if self.search_query.pop().is_some() {
            self.search_due = Some(now + self.search_debounce);
        }
    }

    /// The query to send once typing has been quiet for the debounce period.
    pub fn take_due_search(&mut self, now: Instant) -> Option<String> {
        match self.search_due {
            Some(due) if due <= now => {
                self.search_due = None;
                Some(self.search_query.trim().to_string())
            }
            _ => None,
        }
    }
}
