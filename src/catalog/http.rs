use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;

use crate::config::{CatalogSettings, LibrarySettings};
use crate::library::{MediaSource, Track, TrackId, display_from_fields};

use super::{CatalogError, CatalogService, PlaylistSummary};

/// One row of the server's `songs` table as returned by `/api/songs`.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct SongRow {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub genre: Option<String>,
    /// Seconds; the upload form leaves it empty for some files.
    pub duration: Option<f64>,
    pub file_path: String,
    pub artwork_path: Option<String>,
}

/// One row of the `playlists` table.
#[derive(Debug, Clone, Deserialize)]
struct PlaylistRow {
    id: i64,
    name: String,
    description: Option<String>,
}

impl From<PlaylistRow> for PlaylistSummary {
    fn from(row: PlaylistRow) -> Self {
        Self {
            id: row.id.to_string(),
            name: row.name,
            description: row.description.filter(|d| !d.trim().is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Catalog served by the streaming web app.
pub struct HttpCatalog {
    client: Client,
    base: Url,
    library: LibrarySettings,
    token: Option<String>,
    reporter: Sender<TrackId>,
}

impl HttpCatalog {
    pub fn new(settings: &CatalogSettings, library: &LibrarySettings) -> Result<Self, CatalogError> {
        let raw = settings.base_url.as_deref().unwrap_or_default().trim();
        let base = parse_base_url(raw)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()?;

        let reporter = spawn_play_reporter(client.clone(), base.clone(), settings.token.clone());

        Ok(Self {
            client,
            base,
            library: library.clone(),
            token: settings.token.clone(),
            reporter,
        })
    }

    /// GET with the user's token; favorites and playlists are per user.
    fn get_authed(&self, url: Url) -> RequestBuilder {
        authorize(self.client.get(url), self.token.as_deref())
    }

    fn fetch_tracks(&self, req: RequestBuilder) -> Result<Vec<Track>, CatalogError> {
        let resp = check_status(req.send()?)?;
        let rows: Vec<SongRow> = resp.json()?;
        Ok(rows.into_iter().map(|r| self.track_from_row(r)).collect())
    }

    pub(super) fn track_from_row(&self, row: SongRow) -> Track {
        let source = resolve(&self.base, &row.file_path);
        let artist = Some(row.artist.trim().to_string()).filter(|a| !a.is_empty());
        let album = row.album.filter(|a| !a.trim().is_empty());
        let display = display_from_fields(
            &source,
            &row.title,
            artist.as_deref(),
            album.as_deref(),
            &self.library.display_fields,
            &self.library.display_separator,
        );

        Track {
            id: TrackId(row.id.to_string()),
            title: row.title,
            artist,
            album,
            genre: row.genre.filter(|g| !g.trim().is_empty()),
            duration: row
                .duration
                .filter(|d| d.is_finite() && *d > 0.0)
                .map(Duration::from_secs_f64),
            source,
            artwork: row
                .artwork_path
                .filter(|a| !a.trim().is_empty())
                .map(|a| resolve(&self.base, &a).locator()),
            display,
        }
    }
}

impl CatalogService for HttpCatalog {
    fn list_tracks(&self) -> Result<Vec<Track>, CatalogError> {
        let url = endpoint(&self.base, &["api", "songs"])?;
        let tracks = self.fetch_tracks(self.client.get(url))?;
        tracing::info!(count = tracks.len(), "fetched catalog");
        Ok(tracks)
    }

    fn search(&self, query: &str) -> Result<Vec<Track>, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return self.list_tracks();
        }
        let url = endpoint(&self.base, &["api", "songs", "search", query])?;
        self.fetch_tracks(self.client.get(url))
    }

    fn record_play(&self, id: &TrackId) -> Result<(), CatalogError> {
        self.reporter
            .send(id.clone())
            .map_err(|_| CatalogError::Disconnected)
    }

    fn favorites(&self) -> Result<Vec<Track>, CatalogError> {
        let url = endpoint(&self.base, &["api", "favorites"])?;
        let tracks = self.fetch_tracks(self.get_authed(url))?;
        tracing::info!(count = tracks.len(), "fetched favorites");
        Ok(tracks)
    }

    fn playlists(&self) -> Result<Vec<PlaylistSummary>, CatalogError> {
        let url = endpoint(&self.base, &["api", "playlists"])?;
        let resp = check_status(self.get_authed(url).send()?)?;
        let rows: Vec<PlaylistRow> = resp.json()?;
        Ok(rows.into_iter().map(PlaylistSummary::from).collect())
    }

    fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<Track>, CatalogError> {
        let url = endpoint(&self.base, &["api", "playlists", playlist_id, "songs"])?;
        let tracks = self.fetch_tracks(self.get_authed(url))?;
        tracing::info!(playlist = playlist_id, count = tracks.len(), "fetched playlist");
        Ok(tracks)
    }
}

pub(super) fn parse_base_url(raw: &str) -> Result<Url, CatalogError> {
    let url = Url::parse(raw).map_err(|_| CatalogError::InvalidBaseUrl(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(CatalogError::InvalidBaseUrl(raw.to_string()));
    }
    Ok(url)
}

/// Append percent-encoded path segments to `base`.
pub(super) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, CatalogError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| CatalogError::InvalidBaseUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Server paths like `/uploads/songs/x.mp3` are relative to the server root.
pub(super) fn resolve(base: &Url, locator: &str) -> MediaSource {
    match MediaSource::parse(locator) {
        url @ MediaSource::Url(_) => url,
        MediaSource::File(_) => match base.join(locator.trim()) {
            Ok(u) => MediaSource::Url(u.to_string()),
            Err(_) => MediaSource::parse(locator),
        },
    }
}

fn authorize(req: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => req.bearer_auth(token),
        None => req,
    }
}

fn check_status(resp: Response) -> Result<Response, CatalogError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.error)
        .unwrap_or(text);
    Err(CatalogError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Post play reports off the caller's thread; failures are logged and dropped.
fn spawn_play_reporter(client: Client, base: Url, token: Option<String>) -> Sender<TrackId> {
    let (tx, rx) = mpsc::channel::<TrackId>();
    thread::spawn(move || {
        for id in rx {
            let result = endpoint(&base, &["api", "songs", id.as_str(), "play"]).and_then(|url| {
                let req = authorize(client.post(url), token.as_deref());
                check_status(req.send()?).map(|_| ())
            });
            match result {
                Ok(()) => tracing::debug!(track = %id, "play recorded"),
                Err(e) => tracing::warn!(track = %id, "failed to record play: {e}"),
            }
        }
    });
    tx
}
