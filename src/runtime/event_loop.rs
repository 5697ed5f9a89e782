use std::sync::mpsc::{Receiver, Sender};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::audio::{AudioEvent, RodioOutput};
use crate::catalog::PlaylistSummary;
use crate::config;
use crate::library::Track;
use crate::mpris::{ControlCmd, MprisHandle};
use crate::player::{Direction, Notification, PlaybackController, PlaybackError, PlayerState};
use crate::runtime::fetch::Fetcher;
use crate::runtime::mpris_sync::update_mpris;
use crate::ui;

/// Everything the event loop owns while the player runs.
pub struct Session {
    pub controller: PlaybackController<RodioOutput>,
    pub notifications: Receiver<Notification>,
    pub audio_events: Receiver<AudioEvent>,
    pub control_tx: Sender<ControlCmd>,
    pub control_rx: Receiver<ControlCmd>,
    pub mpris: MprisHandle,
    pub fetcher: Fetcher<Vec<Track>>,
    pub playlist_fetcher: Fetcher<Vec<PlaylistSummary>>,
    pub app: App,
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
}

impl Session {
    /// Ask the catalog for the current view, narrowed to `query` (blank =
    /// everything).
    pub fn request_catalog(&mut self, query: &str) {
        self.app.catalog_busy = true;
        let view = self.app.view.clone();
        let query = query.to_string();
        self.fetcher.request(move |catalog| view.fetch(catalog, &query));
    }

    /// Reload the playlist names the view switch cycles through.
    pub fn refresh_playlists(&mut self) {
        if self.app.collections {
            self.playlist_fetcher.request(|catalog| catalog.playlists());
        }
    }

    fn switch_view(&mut self) {
        let view = self.app.next_view();
        tracing::info!(view = view.label(), "switching catalog view");
        self.app.set_view(view);
        self.request_catalog("");
    }

    /// Output failures are already published by the controller; the rest
    /// only reach the user through here.
    fn note(&mut self, result: Result<(), PlaybackError>) {
        match result {
            Ok(()) => {}
            Err(PlaybackError::UnplayableSource(_) | PlaybackError::Output(_)) => {}
            Err(e) => {
                tracing::debug!("ignored command: {e}");
                self.app.show_error(e.to_string(), Instant::now());
            }
        }
    }

    fn quit(&self, settings: &config::Settings) {
        tracing::info!(
            track = ?self.controller.current_track().map(|t| t.id.as_str()),
            "quitting"
        );
        self.controller
            .output()
            .quit_softly(Duration::from_millis(settings.audio.quit_fade_out_ms));
    }

    /// Apply everything that arrived from worker threads since the last frame.
    fn pump(&mut self, now: Instant) {
        while let Ok(ev) = self.audio_events.try_recv() {
            // Failures are published as notifications.
            let _ = self.controller.handle_audio_event(ev);
        }

        if let Some(result) = self.fetcher.poll() {
            match result {
                Ok(tracks) => self.controller.replace_playlist(tracks),
                Err(e) => {
                    tracing::warn!("catalog request failed: {e}");
                    self.app.catalog_busy = false;
                    self.app.show_error(format!("catalog: {e}"), now);
                }
            }
        }

        if let Some(result) = self.playlist_fetcher.poll() {
            match result {
                Ok(playlists) => self.app.playlists = playlists,
                Err(e) => {
                    tracing::warn!("listing playlists failed: {e}");
                    self.app.show_error(format!("playlists: {e}"), now);
                }
            }
        }

        if let Some(query) = self.app.take_due_search(now) {
            self.request_catalog(&query);
        }

        let mut mpris_dirty = false;
        for n in self.notifications.try_iter() {
            mpris_dirty |= self.app.apply(&n, now);
        }
        if mpris_dirty {
            update_mpris(&self.mpris, &self.app);
        }
        self.mpris.set_position(self.app.elapsed);
    }

    fn play_selected(&mut self) {
        if !self.app.has_tracks() {
            return;
        }
        let selected = self.app.selected;
        let state = self.controller.state();
        let already = state.current_index == Some(selected) && state.is_playing;
        if !already {
            if !self.app.search_mode {
                self.app.follow_playback_on();
            }
            let result = self.controller.select_track(selected);
            self.note(result);
        }
    }

    fn scrub(&mut self, delta: f64) {
        let target = self.controller.state().progress() + delta;
        let result = self.controller.seek_to_fraction(target);
        self.note(result);
    }

    /// Seek to an absolute position; needs a known duration.
    fn seek_to_seconds(&mut self, seconds: f64) {
        let result = match self.controller.state().duration.filter(|d| *d > 0.0) {
            Some(duration) => self.controller.seek_to_fraction(seconds / duration),
            None => Err(PlaybackError::InvalidSeekTarget),
        };
        self.note(result);
    }

    fn nudge_volume(&mut self, delta: f32) {
        let target = self.controller.state().volume + delta;
        let result = self.controller.set_volume(target);
        self.note(result);
    }
}

/// Main terminal event loop: handles input, UI drawing and the messages of
/// the audio, catalog and MPRIS threads. Returns `Ok(())` when shutdown is
/// requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    s: &mut Session,
) -> Result<()> {
    loop {
        let now = Instant::now();
        s.pump(now);

        terminal.draw(|f| ui::draw(f, &s.app, &settings.ui, now))?;

        while let Ok(cmd) = s.control_rx.try_recv() {
            if handle_control_cmd(cmd, settings, s) {
                return Ok(());
            }
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, s) {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn handle_control_cmd(cmd: ControlCmd, settings: &config::Settings, s: &mut Session) -> bool {
    let phase = s.controller.state().phase;
    let is_playing = s.controller.state().is_playing;

    match cmd {
        ControlCmd::Quit => {
            s.quit(settings);
            return true;
        }
        ControlCmd::Play => match phase {
            PlayerState::Idle => s.play_selected(),
            PlayerState::Playing => {}
            PlayerState::Loading | PlayerState::Paused => {
                if !is_playing {
                    let result = s.controller.toggle_play_pause();
                    s.note(result);
                }
            }
        },
        ControlCmd::Pause | ControlCmd::Stop => {
            if is_playing {
                let result = s.controller.toggle_play_pause();
                s.note(result);
            }
        }
        ControlCmd::PlayPause => {
            if !s.app.search_mode {
                s.app.follow_playback_on();
            }
            if phase == PlayerState::Idle {
                s.play_selected();
            } else {
                let result = s.controller.toggle_play_pause();
                s.note(result);
            }
        }
        ControlCmd::Next | ControlCmd::Prev => {
            if s.app.has_tracks() && !s.app.search_mode {
                s.app.follow_playback_on();
            }
            let direction = if cmd == ControlCmd::Next {
                Direction::Next
            } else {
                Direction::Previous
            };
            let result = s.controller.advance(direction);
            s.note(result);
        }
        ControlCmd::SeekBy { micros } => {
            let target = s.controller.state().elapsed + micros as f64 / 1_000_000.0;
            s.seek_to_seconds(target);
        }
        ControlCmd::SetPosition { micros } => s.seek_to_seconds(micros as f64 / 1_000_000.0),
    }

    false
}

fn handle_key_event(key: KeyEvent, settings: &config::Settings, s: &mut Session) -> bool {
    let now = Instant::now();

    if s.app.search_mode {
        s.pending_gg = false;
        match key.code {
            KeyCode::Esc => s.app.clear_search(now),
            KeyCode::Backspace => s.app.pop_search_char(now),
            KeyCode::Char('j') | KeyCode::Char('n')
                if key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                s.app.next();
            }
            KeyCode::Char('k') | KeyCode::Char('p')
                if key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                s.app.prev();
            }
            KeyCode::Down => s.app.next(),
            KeyCode::Up => s.app.prev(),
            KeyCode::Char(c) => {
                if !c.is_control() {
                    s.app.push_search_char(c, now);
                }
            }
            KeyCode::Enter => {
                s.app.exit_search_mode();
                s.play_selected();
            }
            _ => {}
        }

        return false;
    }

    if key.code != KeyCode::Char('g') {
        s.pending_gg = false;
    }

    match key.code {
        KeyCode::Char('q') => {
            s.quit(settings);
            return true;
        }
        KeyCode::Char('/') => s.app.enter_search_mode(),
        KeyCode::Char('s') => s.controller.toggle_shuffle(),
        KeyCode::Char('r') => s.controller.cycle_repeat_mode(),
        KeyCode::Char('R') => {
            let query = s.app.search_query.clone();
            s.request_catalog(&query);
            s.refresh_playlists();
        }
        KeyCode::Char('v') => s.switch_view(),
        KeyCode::Char('g') => {
            if s.pending_gg {
                s.pending_gg = false;
                s.app.follow_playback_off();
                s.app.select_first();
            } else {
                s.pending_gg = true;
            }
        }
        KeyCode::Char('G') => {
            s.app.follow_playback_off();
            s.app.select_last();
        }
        KeyCode::Char('j') | KeyCode::Down => {
            s.app.follow_playback_off();
            s.app.next();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            s.app.follow_playback_off();
            s.app.prev();
        }
        KeyCode::Enter => s.play_selected(),
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            let _ = s.control_tx.send(ControlCmd::PlayPause);
        }
        KeyCode::Char('l') => {
            let _ = s.control_tx.send(ControlCmd::Next);
        }
        KeyCode::Char('h') => {
            let _ = s.control_tx.send(ControlCmd::Prev);
        }
        KeyCode::Char('L') => s.scrub(settings.ui.scrub_fraction),
        KeyCode::Char('H') => s.scrub(-settings.ui.scrub_fraction),
        KeyCode::Char('+') | KeyCode::Char('=') => s.nudge_volume(settings.ui.volume_step),
        KeyCode::Char('-') => s.nudge_volume(-settings.ui.volume_step),
        KeyCode::Char('m') => {
            let result = s.controller.toggle_mute();
            s.note(result);
        }
        _ => {}
    }

    false
}
