//! Audio-related small types and handles.
//!
//! This module defines the events an output raises, its error type, the
//! commands sent to the audio thread and the shared playback info handle.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;

use crate::library::MediaSource;

/// Lifecycle notifications raised by an audio output.
///
/// Every event names the source it concerns; a load can be superseded
/// while its events are still in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
    /// Periodic progress while playing. `duration` is 0 when unknown.
    TimeUpdate {
        source: MediaSource,
        current: f64,
        duration: f64,
    },
    /// The loaded source is decodable; `duration` is `None` when the format
    /// does not report one.
    MetadataLoaded {
        source: MediaSource,
        duration: Option<f64>,
    },
    /// `source` played to its end.
    Ended { source: MediaSource },
    /// An asynchronous failure for `source` (e.g. the bytes would not decode).
    Error { source: MediaSource, error: AudioError },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AudioError {
    #[error("cannot play {locator}: {reason}")]
    UnplayableSource { locator: String, reason: String },

    #[error("audio device error: {0}")]
    Device(String),

    #[error("audio thread is not running")]
    Disconnected,
}

#[derive(Debug)]
pub(super) enum AudioCmd {
    /// Replace the current source (paused until `Play`).
    Load(MediaSource),
    Play,
    Pause,
    /// Absolute position in seconds.
    Seek(f64),
    SetVolume(f32),
    /// Quit the audio thread, optionally fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

#[derive(Debug, Clone, Default)]
/// Runtime playback information shared with the controller thread.
pub struct PlaybackInfo {
    /// Elapsed playback time for the current source.
    pub elapsed: Duration,
}

pub type PlaybackHandle = Arc<Mutex<PlaybackInfo>>;
