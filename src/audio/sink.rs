//! Utilities for turning a `MediaSource` into a `rodio` sink.
//!
//! Sources are read fully into memory once per load so that seeking and
//! replaying after the end never touch the network again.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use lofty::prelude::*;
use lofty::probe::Probe;
use rodio::{Decoder, OutputStream, Sink, Source};

use crate::library::MediaSource;

use super::types::AudioError;

/// Bytes of the current source plus what we learned while decoding it.
pub(super) struct LoadedMedia {
    pub bytes: Arc<[u8]>,
    pub duration: Option<Duration>,
}

/// Reject sources that cannot possibly load before handing them to the thread.
pub(super) fn check_source(source: &MediaSource) -> Result<(), AudioError> {
    match source {
        MediaSource::File(path) if !path.is_file() => Err(AudioError::UnplayableSource {
            locator: source.locator(),
            reason: "file not found".to_string(),
        }),
        MediaSource::Url(url) if url.trim().is_empty() => Err(AudioError::UnplayableSource {
            locator: source.locator(),
            reason: "empty url".to_string(),
        }),
        _ => Ok(()),
    }
}

pub(super) fn fetch_bytes(
    client: &reqwest::blocking::Client,
    source: &MediaSource,
) -> Result<Arc<[u8]>, String> {
    match source {
        MediaSource::File(path) => std::fs::read(path)
            .map(Arc::from)
            .map_err(|e| e.to_string()),
        MediaSource::Url(url) => {
            let resp = client
                .get(url)
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(|e| e.to_string())?;
            let body = resp.bytes().map_err(|e| e.to_string())?;
            Ok(Arc::from(body.as_ref()))
        }
    }
}

/// Duration from container metadata, for formats whose decoder cannot tell.
pub(super) fn probe_duration(bytes: &[u8]) -> Option<Duration> {
    let tagged = Probe::new(Cursor::new(bytes))
        .guess_file_type()
        .ok()?
        .read()
        .ok()?;
    let d = tagged.properties().duration();
    (!d.is_zero()).then_some(d)
}

/// Fetch and decode `source`, returning the media and a paused sink.
pub(super) fn load_media(
    client: &reqwest::blocking::Client,
    stream: &OutputStream,
    source: &MediaSource,
) -> Result<(LoadedMedia, Sink), String> {
    let bytes = fetch_bytes(client, source)?;
    let decoder = Decoder::new(Cursor::new(bytes.clone())).map_err(|e| e.to_string())?;
    let duration = decoder
        .total_duration()
        .or_else(|| probe_duration(&bytes));

    let sink = Sink::connect_new(stream.mixer());
    sink.append(decoder);
    sink.pause();
    Ok((LoadedMedia { bytes, duration }, sink))
}

/// Create a paused `Sink` over already-fetched bytes that starts at `start_at`.
///
/// Used to replay a source whose sink already drained.
pub(super) fn create_sink_at(
    stream: &OutputStream,
    media: &LoadedMedia,
    start_at: Duration,
) -> Result<Sink, String> {
    let source = Decoder::new(Cursor::new(media.bytes.clone()))
        .map_err(|e| e.to_string())?
        // `skip_duration` is our seeking primitive; even Duration::ZERO is fine.
        .skip_duration(start_at);

    let sink = Sink::connect_new(stream.mixer());
    sink.append(source);
    sink.pause();
    Ok(sink)
}
