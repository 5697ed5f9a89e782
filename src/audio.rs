//! Audio output abstraction and its `rodio` implementation.
//!
//! The playback controller only sees [`AudioOutput`]; lifecycle events come
//! back as [`AudioEvent`]s over an `mpsc` channel the runtime drains.

mod output;
mod player;
mod sink;
mod thread;
mod types;

pub use output::AudioOutput;
pub use player::RodioOutput;
pub use types::{AudioError, AudioEvent};
