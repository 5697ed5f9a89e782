use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::LibrarySettings;
use crate::library::{Track, TrackId, scan};

use super::{CatalogError, CatalogService, filter_tracks};

/// Catalog over a directory of audio files.
///
/// `list_tracks` rescans the directory; `search` filters the last scan.
pub struct LocalCatalog {
    dir: PathBuf,
    settings: LibrarySettings,
    tracks: Mutex<Vec<Track>>,
    plays: Mutex<HashMap<TrackId, u64>>,
}

impl LocalCatalog {
    pub fn open(dir: &Path, settings: &LibrarySettings) -> Result<Self, CatalogError> {
        if !dir.is_dir() {
            return Err(CatalogError::MissingDirectory(dir.to_path_buf()));
        }
        let tracks = scan(dir, settings);
        tracing::info!(dir = %dir.display(), count = tracks.len(), "scanned music directory");
        Ok(Self {
            dir: dir.to_path_buf(),
            settings: settings.clone(),
            tracks: Mutex::new(tracks),
            plays: Mutex::new(HashMap::new()),
        })
    }

    /// Plays recorded for `id` during this session.
    #[cfg(test)]
    pub fn play_count(&self, id: &TrackId) -> u64 {
        self.plays
            .lock()
            .ok()
            .and_then(|p| p.get(id).copied())
            .unwrap_or(0)
    }

    fn snapshot(&self) -> Vec<Track> {
        self.tracks.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

impl CatalogService for LocalCatalog {
    fn list_tracks(&self) -> Result<Vec<Track>, CatalogError> {
        if !self.dir.is_dir() {
            return Err(CatalogError::MissingDirectory(self.dir.clone()));
        }
        let fresh = scan(&self.dir, &self.settings);
        if let Ok(mut tracks) = self.tracks.lock() {
            *tracks = fresh.clone();
        }
        Ok(fresh)
    }

    fn search(&self, query: &str) -> Result<Vec<Track>, CatalogError> {
        Ok(filter_tracks(self.snapshot(), query))
    }

    fn record_play(&self, id: &TrackId) -> Result<(), CatalogError> {
        if let Ok(mut plays) = self.plays.lock() {
            let count = plays.entry(id.clone()).or_insert(0);
            *count += 1;
            tracing::debug!(track = %id, plays = *count, "play recorded");
        }
        Ok(())
    }
}
