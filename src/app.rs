//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and mirrors the playlist view and
//! playback state published by the controller.

mod model;

pub use model::*;

#[cfg(test)]
mod tests;
