use crate::library::MediaSource;

use super::types::AudioError;

/// A single streamable media sink.
///
/// Commands return once they are accepted; outcomes that are only known
/// later (decode failures, end of track, progress) arrive as
/// [`AudioEvent`](super::AudioEvent)s on the channel the output was built with.
pub trait AudioOutput {
    /// Replace the current source. The output stays paused until `play`.
    fn load(&mut self, source: &MediaSource) -> Result<(), AudioError>;

    fn play(&mut self) -> Result<(), AudioError>;

    fn pause(&mut self) -> Result<(), AudioError>;

    /// Jump to an absolute position in seconds.
    fn seek(&mut self, seconds: f64) -> Result<(), AudioError>;

    /// `volume` is already clamped to `[0, 1]` by the caller.
    fn set_volume(&mut self, volume: f32) -> Result<(), AudioError>;

    /// Elapsed playback position of the current source, in seconds.
    fn elapsed(&self) -> f64;
}
