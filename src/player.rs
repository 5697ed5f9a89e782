//! Playback controller: the state machine that owns the current track,
//! playlist position, shuffle/repeat modes, volume and play/pause state.
//!
//! The controller drives an [`AudioOutput`](crate::audio::AudioOutput),
//! consumes its [`AudioEvent`](crate::audio::AudioEvent)s and publishes
//! [`Notification`]s to whoever subscribed (the TUI, MPRIS).

mod controller;
mod error;
mod notify;
mod state;

pub use controller::{ControllerOptions, PlaybackController};
pub use error::PlaybackError;
pub use notify::Notification;
pub use state::*;
