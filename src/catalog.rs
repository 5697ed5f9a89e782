//! Track catalogs the playback controller draws its playlist view from.
//!
//! Two implementations: [`LocalCatalog`] scans a music directory and
//! [`HttpCatalog`] talks to the streaming server's REST API. Only the server
//! keeps favorites and playlists; both are read-only here.

mod http;
mod local;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{CatalogSource, Settings};
use crate::library::{Track, TrackId};

pub use http::HttpCatalog;
pub use local::LocalCatalog;

/// A saved playlist as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

/// Supplies playable tracks and accepts play reports.
pub trait CatalogService: Send + Sync {
    /// Every track, in catalog order.
    fn list_tracks(&self) -> Result<Vec<Track>, CatalogError>;

    /// Tracks whose title, artist, album or genre contains `query`.
    fn search(&self, query: &str) -> Result<Vec<Track>, CatalogError>;

    /// Best-effort play report. Implementations must return without waiting
    /// on the network.
    fn record_play(&self, id: &TrackId) -> Result<(), CatalogError>;

    /// The user's favourite tracks, most recently added first.
    fn favorites(&self) -> Result<Vec<Track>, CatalogError> {
        Err(CatalogError::Unsupported("favorites"))
    }

    /// The user's playlists, newest first.
    fn playlists(&self) -> Result<Vec<PlaylistSummary>, CatalogError> {
        Err(CatalogError::Unsupported("playlists"))
    }

    /// Tracks of one playlist, in playlist order.
    fn playlist_tracks(&self, _playlist_id: &str) -> Result<Vec<Track>, CatalogError> {
        Err(CatalogError::Unsupported("playlists"))
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid base url {0:?}")]
    InvalidBaseUrl(String),

    #[error("music directory {0:?} does not exist")]
    MissingDirectory(PathBuf),

    #[error("play reporter is not running")]
    Disconnected,

    #[error("{0} are not available from this catalog")]
    Unsupported(&'static str),
}

/// Which collection the playlist view is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CatalogView {
    #[default]
    Library,
    Favorites,
    Playlist(PlaylistSummary),
}

impl CatalogView {
    pub fn label(&self) -> &str {
        match self {
            Self::Library => "Library",
            Self::Favorites => "Favorites",
            Self::Playlist(p) => &p.name,
        }
    }

    /// Fetch this view, narrowed to `query` when it is not blank.
    ///
    /// The library is searched server-side; favorites and playlists are
    /// filtered after fetching.
    pub fn fetch(&self, catalog: &dyn CatalogService, query: &str) -> Result<Vec<Track>, CatalogError> {
        let query = query.trim();
        match self {
            Self::Library if query.is_empty() => catalog.list_tracks(),
            Self::Library => catalog.search(query),
            Self::Favorites => Ok(filter_tracks(catalog.favorites()?, query)),
            Self::Playlist(p) => Ok(filter_tracks(catalog.playlist_tracks(&p.id)?, query)),
        }
    }
}

/// Keep the tracks matching `query` (case-insensitive); blank keeps all.
pub fn filter_tracks(mut tracks: Vec<Track>, query: &str) -> Vec<Track> {
    let needle = query.trim().to_lowercase();
    tracks.retain(|t| t.matches(&needle));
    tracks
}

/// Build the catalog selected by `settings.catalog.source`.
pub fn open(settings: &Settings) -> Result<Arc<dyn CatalogService>, CatalogError> {
    match settings.catalog.source {
        CatalogSource::Local => {
            let dir = match &settings.catalog.music_dir {
                Some(d) => d.clone(),
                None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            };
            Ok(Arc::new(LocalCatalog::open(&dir, &settings.library)?))
        }
        CatalogSource::Http => Ok(Arc::new(HttpCatalog::new(
            &settings.catalog,
            &settings.library,
        )?)),
    }
}
