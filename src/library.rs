//! Track model, display helpers and local directory scanning.
//!
//! `Track` is the unit every other module passes around: catalogs produce
//! them, the playback controller orders them into a playlist view and the
//! UI renders them.

mod display;
mod model;
mod scan;

pub use display::{display_from_fields, format_duration};
pub use model::*;
pub use scan::scan;

#[cfg(test)]
mod tests;
