use crate::config::RepeatModeSetting;

/// Volume restored by `toggle_mute` when nothing was remembered.
pub const DEFAULT_VOLUME: f32 = 0.7;

/// Lifecycle phase of the current track.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlayerState {
    /// Nothing loaded, or the last load failed.
    #[default]
    Idle,
    /// A source was handed to the output and its metadata is not known yet.
    Loading,
    Playing,
    Paused,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RepeatMode {
    #[default]
    Off,
    RepeatAll,
    RepeatOne,
}

impl RepeatMode {
    /// `Off -> RepeatAll -> RepeatOne -> Off`.
    pub fn cycled(self) -> Self {
        match self {
            Self::Off => Self::RepeatAll,
            Self::RepeatAll => Self::RepeatOne,
            Self::RepeatOne => Self::Off,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::RepeatAll => "Repeat-all",
            Self::RepeatOne => "Repeat-one",
        }
    }
}

impl From<RepeatModeSetting> for RepeatMode {
    fn from(s: RepeatModeSetting) -> Self {
        match s {
            RepeatModeSetting::Off => Self::Off,
            RepeatModeSetting::RepeatAll => Self::RepeatAll,
            RepeatModeSetting::RepeatOne => Self::RepeatOne,
        }
    }
}

/// Coarse volume level for icons and status text.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VolumeTier {
    Muted,
    Low,
    Full,
}

impl VolumeTier {
    pub fn of(volume: f32) -> Self {
        if volume <= 0.0 {
            Self::Muted
        } else if volume < 0.5 {
            Self::Low
        } else {
            Self::Full
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Everything the controller knows about the session.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackState {
    pub current_index: Option<usize>,
    /// Play intent. Can be true while still `Loading`.
    pub is_playing: bool,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub volume: f32,
    pub muted_prior_volume: Option<f32>,
    pub phase: PlayerState,
    /// Seconds into the current track.
    pub elapsed: f64,
    /// Last known duration of the current track, in seconds.
    pub duration: Option<f64>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_index: None,
            is_playing: false,
            shuffle: false,
            repeat: RepeatMode::Off,
            volume: DEFAULT_VOLUME,
            muted_prior_volume: None,
            phase: PlayerState::Idle,
            elapsed: 0.0,
            duration: None,
        }
    }
}

impl PlaybackState {
    pub fn volume_tier(&self) -> VolumeTier {
        VolumeTier::of(self.volume)
    }

    /// `elapsed / duration` in `[0, 1]`; 0 when the duration is unknown.
    pub fn progress(&self) -> f64 {
        progress_fraction(self.elapsed, self.duration.unwrap_or(0.0))
    }
}

pub(super) fn progress_fraction(current: f64, total: f64) -> f64 {
    if !total.is_finite() || total <= 0.0 || !current.is_finite() {
        return 0.0;
    }
    (current / total).clamp(0.0, 1.0)
}
