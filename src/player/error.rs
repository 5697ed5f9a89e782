use thiserror::Error;

use crate::audio::AudioError;

/// Non-fatal failures of a controller operation.
///
/// The controller stays usable after any of these; it never retries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    #[error("{0}")]
    UnplayableSource(String),

    #[error("playlist is empty")]
    EmptyPlaylist,

    #[error("track {index} is out of range (playlist has {len})")]
    TrackOutOfRange { index: usize, len: usize },

    #[error("cannot seek: track duration is unknown")]
    InvalidSeekTarget,

    #[error(transparent)]
    Output(AudioError),
}

impl From<AudioError> for PlaybackError {
    fn from(e: AudioError) -> Self {
        match e {
            AudioError::UnplayableSource { .. } => Self::UnplayableSource(e.to_string()),
            other => Self::Output(other),
        }
    }
}
