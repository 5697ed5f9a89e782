use crate::app::App;
use crate::config::{self, CatalogSource};
use crate::player::PlaybackState;

/// Seed the view model with the controller's initial modes; afterwards it
/// only changes through notifications.
pub fn apply_playback_defaults(app: &mut App, state: &PlaybackState) {
    app.phase = state.phase;
    app.is_playing = state.is_playing;
    app.volume = state.volume;
    app.volume_tier = state.volume_tier();
    app.shuffle = state.shuffle;
    app.repeat = state.repeat;
}

/// Short description of where tracks come from, for the status box.
pub fn catalog_label(settings: &config::Settings) -> String {
    match settings.catalog.source {
        CatalogSource::Local => settings
            .catalog
            .music_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .or_else(|| {
                std::env::current_dir()
                    .ok()
                    .map(|d| d.display().to_string())
            })
            .unwrap_or_else(|| ".".to_string()),
        CatalogSource::Http => settings.catalog.base_url.clone().unwrap_or_default(),
    }
}

/// Only the server keeps favorites and playlists.
pub fn has_collections(settings: &config::Settings) -> bool {
    settings.catalog.source == CatalogSource::Http
}
