use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Opaque catalog identifier for a track.
///
/// Remote catalogs use the numeric row id, local catalogs the file path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Where the audio bytes of a track can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    File(PathBuf),
    Url(String),
}

impl MediaSource {
    /// Interpret a locator string: `http://` and `https://` are URLs, anything
    /// else is a filesystem path.
    pub fn parse(locator: &str) -> Self {
        let lower = locator.trim_start().to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(locator.trim().to_string())
        } else {
            Self::File(PathBuf::from(locator))
        }
    }

    pub fn locator(&self) -> String {
        match self {
            Self::File(p) => p.display().to_string(),
            Self::Url(u) => u.clone(),
        }
    }

    /// File stem of the locator, used as a title fallback.
    pub fn stem(&self) -> Option<String> {
        match self {
            Self::File(p) => p.file_stem().and_then(|s| s.to_str()).map(str::to_string),
            Self::Url(u) => {
                let last = u.trim_end_matches('/').rsplit('/').next()?;
                let last = last.split(['?', '#']).next()?;
                let stem = last.rsplit_once('.').map(|(s, _)| s).unwrap_or(last);
                (!stem.is_empty()).then(|| stem.to_string())
            }
        }
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.locator())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub duration: Option<Duration>,
    pub source: MediaSource,
    pub artwork: Option<String>,
    pub display: String,
}

impl Track {
    /// Case-insensitive substring match over title, artist, album and genre.
    ///
    /// `needle_lower` must already be lowercase.
    pub fn matches(&self, needle_lower: &str) -> bool {
        if needle_lower.is_empty() {
            return true;
        }
        let hit = |s: &str| s.to_lowercase().contains(needle_lower);
        hit(&self.title)
            || self.artist.as_deref().is_some_and(hit)
            || self.album.as_deref().is_some_and(hit)
            || self.genre.as_deref().is_some_and(hit)
    }
}
