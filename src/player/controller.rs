use std::sync::Arc;
use std::sync::mpsc::Receiver;

use crate::audio::{AudioError, AudioEvent, AudioOutput};
use crate::catalog::CatalogService;
use crate::config::PlaybackSettings;
use crate::library::{MediaSource, Track};

use super::error::PlaybackError;
use super::notify::{Notification, Subscribers};
use super::state::{
    DEFAULT_VOLUME, Direction, PlaybackState, PlayerState, RepeatMode, VolumeTier,
    progress_fraction,
};

/// Initial modes and policies of a controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerOptions {
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub volume: f32,
    /// "Previous" restarts the current track once it is past this many seconds.
    pub restart_threshold: f64,
    /// Start playback as soon as a track is selected.
    pub autoplay: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            shuffle: false,
            repeat: RepeatMode::Off,
            volume: DEFAULT_VOLUME,
            restart_threshold: 3.0,
            autoplay: true,
        }
    }
}

impl From<&PlaybackSettings> for ControllerOptions {
    fn from(s: &PlaybackSettings) -> Self {
        Self {
            shuffle: s.shuffle,
            repeat: s.repeat_mode.into(),
            volume: s.volume,
            restart_threshold: s.restart_threshold_secs,
            autoplay: s.autoplay,
        }
    }
}

/// Owns the playback state and the playlist view, and drives an output.
///
/// Single-threaded: every operation runs to completion on the caller's
/// thread. Output events are fed back through [`handle_audio_event`].
///
/// [`handle_audio_event`]: PlaybackController::handle_audio_event
pub struct PlaybackController<O: AudioOutput> {
    output: O,
    catalog: Arc<dyn CatalogService>,
    playlist: Vec<Track>,
    /// The loaded track. Survives playlist replacement even when it is no
    /// longer part of the view.
    current: Option<Track>,
    state: PlaybackState,
    /// True between `load` and the output's metadata (or error) event.
    awaiting_metadata: bool,
    restart_threshold: f64,
    autoplay: bool,
    subscribers: Subscribers,
}

impl<O: AudioOutput> PlaybackController<O> {
    pub fn new(mut output: O, catalog: Arc<dyn CatalogService>, options: ControllerOptions) -> Self {
        let volume = clamp_volume(options.volume);
        if let Err(e) = output.set_volume(volume) {
            tracing::warn!("failed to apply initial volume: {e}");
        }

        Self {
            output,
            catalog,
            playlist: Vec::new(),
            current: None,
            state: PlaybackState {
                shuffle: options.shuffle,
                repeat: options.repeat,
                volume,
                ..PlaybackState::default()
            },
            awaiting_metadata: false,
            restart_threshold: options.restart_threshold,
            autoplay: options.autoplay,
            subscribers: Subscribers::default(),
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Receive every notification published from now on.
    pub fn subscribe(&mut self) -> Receiver<Notification> {
        self.subscribers.subscribe()
    }

    /// Swap the playlist view. The current track keeps playing; its index is
    /// looked up by id in the new view, or cleared when it is absent.
    pub fn replace_playlist(&mut self, tracks: Vec<Track>) {
        self.playlist = tracks;
        self.state.current_index = self
            .current
            .as_ref()
            .and_then(|cur| self.playlist.iter().position(|t| t.id == cur.id));

        tracing::debug!(
            len = self.playlist.len(),
            current = ?self.state.current_index,
            "playlist replaced"
        );
        self.publish(Notification::PlaylistReplaced {
            tracks: self.playlist.clone(),
            current_index: self.state.current_index,
        });
    }

    /// Load the track at `index` and, with autoplay, start it.
    pub fn select_track(&mut self, index: usize) -> Result<(), PlaybackError> {
        let len = self.playlist.len();
        if len == 0 {
            return Err(PlaybackError::EmptyPlaylist);
        }
        let Some(track) = self.playlist.get(index).cloned() else {
            return Err(PlaybackError::TrackOutOfRange { index, len });
        };

        self.state.current_index = Some(index);
        self.state.elapsed = 0.0;
        self.state.duration = track.duration.map(|d| d.as_secs_f64());
        self.current = Some(track.clone());
        self.publish(Notification::TrackChanged {
            index,
            track: track.clone(),
        });
        self.publish_progress();

        if let Err(e) = self.output.load(&track.source) {
            self.awaiting_metadata = false;
            self.transition(PlayerState::Idle, false);
            return Err(self.fail(e));
        }
        self.awaiting_metadata = true;
        tracing::debug!(index, track = %track.id, "loading track");

        if let Err(e) = self.catalog.record_play(&track.id) {
            tracing::warn!(track = %track.id, "failed to report play: {e}");
        }

        if !self.autoplay {
            self.transition(PlayerState::Loading, false);
            return Ok(());
        }

        match self.output.play() {
            Ok(()) => {
                self.transition(PlayerState::Loading, true);
                Ok(())
            }
            Err(e) => {
                self.transition(PlayerState::Paused, false);
                Err(self.fail(e))
            }
        }
    }

    pub fn toggle_play_pause(&mut self) -> Result<(), PlaybackError> {
        match self.state.phase {
            PlayerState::Idle => Ok(()),
            PlayerState::Playing => self.pause(),
            PlayerState::Loading if self.state.is_playing => self.pause(),
            PlayerState::Loading | PlayerState::Paused => self.play(),
        }
    }

    pub fn advance(&mut self, direction: Direction) -> Result<(), PlaybackError> {
        let len = self.playlist.len();
        if len == 0 {
            return Ok(());
        }

        let target = match direction {
            Direction::Next if self.state.shuffle => rand::random_range(0..len),
            Direction::Next => self.state.current_index.map_or(0, |i| (i + 1) % len),
            Direction::Previous => {
                if self.current.is_some() && self.output.elapsed() > self.restart_threshold {
                    return self.restart_current();
                }
                self.state
                    .current_index
                    .map_or(len - 1, |i| (i + len - 1) % len)
            }
        };

        self.select_track(target)
    }

    /// The output finished the current track.
    pub fn on_track_ended(&mut self) -> Result<(), PlaybackError> {
        if self.state.repeat == RepeatMode::RepeatOne && self.current.is_some() {
            self.output.seek(0.0).map_err(|e| self.fail(e))?;
            self.output.play().map_err(|e| self.fail(e))?;
            self.state.elapsed = 0.0;
            self.transition(PlayerState::Playing, true);
            self.publish_progress();
            return Ok(());
        }

        let len = self.playlist.len();
        let keep_going = match (self.state.repeat, self.state.current_index) {
            _ if len == 0 => false,
            (RepeatMode::Off, Some(i)) => i + 1 < len,
            _ => true,
        };

        if keep_going {
            return self.advance(Direction::Next);
        }

        if let Err(e) = self.output.pause() {
            tracing::warn!("failed to pause at end of playlist: {e}");
        }
        self.transition(PlayerState::Paused, false);
        Ok(())
    }

    /// Clamp to `[0, 1]` (NaN counts as 0) and apply.
    pub fn set_volume(&mut self, volume: f32) -> Result<(), PlaybackError> {
        let volume = clamp_volume(volume);
        self.output.set_volume(volume).map_err(|e| self.fail(e))?;
        self.state.volume = volume;
        self.publish(Notification::VolumeChanged {
            volume,
            tier: VolumeTier::of(volume),
        });
        Ok(())
    }

    pub fn toggle_mute(&mut self) -> Result<(), PlaybackError> {
        if self.state.volume > 0.0 {
            let prior = self.state.volume;
            self.set_volume(0.0)?;
            self.state.muted_prior_volume = Some(prior);
        } else {
            let restore = self.state.muted_prior_volume.unwrap_or(DEFAULT_VOLUME);
            self.set_volume(restore)?;
            self.state.muted_prior_volume = None;
        }
        Ok(())
    }

    pub fn toggle_shuffle(&mut self) {
        self.state.shuffle = !self.state.shuffle;
        self.publish(Notification::ShuffleChanged(self.state.shuffle));
    }

    pub fn cycle_repeat_mode(&mut self) {
        self.state.repeat = self.state.repeat.cycled();
        self.publish(Notification::RepeatChanged(self.state.repeat));
    }

    /// Progress report from the output. `total` is 0 when unknown.
    pub fn on_time_update(&mut self, current: f64, total: f64) {
        if current.is_finite() {
            self.state.elapsed = current.max(0.0);
        }
        if total.is_finite() && total > 0.0 {
            self.state.duration = Some(total);
        }
        self.publish(Notification::Progress {
            elapsed: self.state.elapsed,
            duration: self.state.duration,
            fraction: progress_fraction(current, total),
        });
    }

    /// The output decoded the current source.
    pub fn on_metadata_loaded(&mut self, duration: Option<f64>) {
        self.awaiting_metadata = false;
        if let Some(d) = duration.filter(|d| d.is_finite() && *d > 0.0) {
            self.state.duration = Some(d);
        }
        if self.state.phase == PlayerState::Loading {
            let phase = if self.state.is_playing {
                PlayerState::Playing
            } else {
                PlayerState::Paused
            };
            self.transition(phase, self.state.is_playing);
        }
        self.publish_progress();
    }

    /// Seek to `fraction` of the last known duration.
    pub fn seek_to_fraction(&mut self, fraction: f64) -> Result<(), PlaybackError> {
        let Some(duration) = self.state.duration.filter(|d| *d > 0.0) else {
            return Err(PlaybackError::InvalidSeekTarget);
        };
        if self.current.is_none() {
            return Err(PlaybackError::InvalidSeekTarget);
        }

        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        let target = fraction * duration;
        self.output.seek(target).map_err(|e| self.fail(e))?;
        self.state.elapsed = target;
        self.publish_progress();
        Ok(())
    }

    /// Apply one event raised by the output.
    ///
    /// Events for any source other than the loaded one are dropped, as are
    /// progress and end reports that arrive before the loaded source's
    /// metadata.
    pub fn handle_audio_event(&mut self, event: AudioEvent) -> Result<(), PlaybackError> {
        match event {
            AudioEvent::TimeUpdate {
                source,
                current,
                duration,
            } => {
                if self.awaiting_metadata || !self.is_current(&source) {
                    tracing::trace!(%source, "ignoring progress from a superseded source");
                } else {
                    self.on_time_update(current, duration);
                }
                Ok(())
            }
            AudioEvent::MetadataLoaded { source, duration } => {
                if self.is_current(&source) {
                    self.on_metadata_loaded(duration);
                } else {
                    tracing::debug!(%source, "ignoring metadata for a superseded source");
                }
                Ok(())
            }
            AudioEvent::Ended { source } => {
                if self.awaiting_metadata || !self.is_current(&source) {
                    tracing::trace!(%source, "ignoring end of a superseded source");
                    return Ok(());
                }
                self.on_track_ended()
            }
            AudioEvent::Error { source, error } => {
                if !self.is_current(&source) {
                    tracing::debug!(%source, "ignoring error for a superseded source: {error}");
                    return Ok(());
                }
                self.awaiting_metadata = false;
                self.transition(PlayerState::Idle, false);
                Err(self.fail(error))
            }
        }
    }

    fn is_current(&self, source: &MediaSource) -> bool {
        self.current.as_ref().is_some_and(|t| t.source == *source)
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        self.output.play().map_err(|e| self.fail(e))?;
        let phase = if self.awaiting_metadata {
            PlayerState::Loading
        } else {
            PlayerState::Playing
        };
        self.transition(phase, true);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        self.output.pause().map_err(|e| self.fail(e))?;
        self.transition(PlayerState::Paused, false);
        Ok(())
    }

    fn restart_current(&mut self) -> Result<(), PlaybackError> {
        self.output.seek(0.0).map_err(|e| self.fail(e))?;
        self.state.elapsed = 0.0;
        self.publish_progress();
        Ok(())
    }

    fn transition(&mut self, phase: PlayerState, is_playing: bool) {
        if self.state.phase == phase && self.state.is_playing == is_playing {
            return;
        }
        tracing::debug!(from = ?self.state.phase, to = ?phase, is_playing, "playback state");
        self.state.phase = phase;
        self.state.is_playing = is_playing;
        self.publish(Notification::StateChanged { phase, is_playing });
    }

    fn fail(&mut self, e: AudioError) -> PlaybackError {
        let err = PlaybackError::from(e);
        tracing::warn!("playback error: {err}");
        self.publish(Notification::Error(err.clone()));
        err
    }

    fn publish_progress(&mut self) {
        self.publish(Notification::Progress {
            elapsed: self.state.elapsed,
            duration: self.state.duration,
            fraction: self.state.progress(),
        });
    }

    fn publish(&mut self, n: Notification) {
        self.subscribers.publish(n);
    }
}

fn clamp_volume(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}
