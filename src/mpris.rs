use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_io::{Timer, block_on};
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

use crate::library::{MediaSource, Track};
use crate::player::PlayerState;

const BUS_NAME: &str = "org.mpris.MediaPlayer2.encore";
const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";

/// Requests coming in from media keys and desktop widgets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlCmd {
    Quit,
    Play,
    Pause,
    PlayPause,
    Stop,
    Next,
    Prev,
    /// Move by a signed offset from the current position.
    SeekBy { micros: i64 },
    /// Jump to an absolute position in the current track.
    SetPosition { micros: i64 },
}

/// MPRIS `PlaybackStatus`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackStatus {
    /// A track that is still loading reports its play intent.
    pub fn from_phase(phase: PlayerState, is_playing: bool) -> Self {
        match phase {
            PlayerState::Idle => Self::Stopped,
            PlayerState::Playing => Self::Playing,
            PlayerState::Paused => Self::Paused,
            PlayerState::Loading if is_playing => Self::Playing,
            PlayerState::Loading => Self::Paused,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
        }
    }
}

#[derive(Debug, Default)]
struct SharedState {
    playback: PlaybackStatus,
    title: Option<String>,
    artist: Vec<String>,
    album: Option<String>,
    genre: Vec<String>,
    url: Option<String>,
    art_url: Option<String>,
    length_micros: Option<i64>,
    position_micros: i64,
    track_id: Option<OwnedObjectPath>,
}

pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
    notify: Sender<()>,
}

impl MprisHandle {
    pub fn set_playback(&self, playback: PlaybackStatus) {
        if let Ok(mut s) = self.state.lock() {
            if s.playback == playback {
                return;
            }
            s.playback = playback;
        }
        let _ = self.notify.send(());
    }

    /// Record the playback position. `Position` is polled by clients, so
    /// this never emits a change.
    pub fn set_position(&self, elapsed_secs: f64) {
        if let Ok(mut s) = self.state.lock() {
            s.position_micros = (elapsed_secs.max(0.0) * 1_000_000.0) as i64;
        }
    }

    /// Publish `track` as the current item, or clear the metadata.
    pub fn set_track_metadata(&self, track: Option<&Track>) {
        if let Ok(mut s) = self.state.lock() {
            match track {
                Some(t) => {
                    s.title = Some(t.title.clone());
                    s.artist = t.artist.iter().cloned().collect();
                    s.album = t.album.clone();
                    s.genre = t.genre.iter().cloned().collect();
                    s.url = Some(uri(&t.source));
                    s.art_url = t.artwork.as_deref().map(|a| uri(&MediaSource::parse(a)));
                    s.length_micros = t
                        .duration
                        .and_then(|d| i64::try_from(d.as_micros()).ok());
                    s.track_id = track_object_path(t);
                }
                None => {
                    s.title = None;
                    s.artist.clear();
                    s.album = None;
                    s.genre.clear();
                    s.url = None;
                    s.art_url = None;
                    s.length_micros = None;
                    s.position_micros = 0;
                    s.track_id = None;
                }
            }
        }
        let _ = self.notify.send(());
    }
}

fn uri(source: &MediaSource) -> String {
    match source {
        MediaSource::File(p) => format!("file://{}", p.display()),
        MediaSource::Url(u) => u.clone(),
    }
}

/// Object paths only allow `[A-Za-z0-9_]` per element.
fn track_object_path(track: &Track) -> Option<OwnedObjectPath> {
    let element: String = track
        .id
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if element.is_empty() {
        return None;
    }
    ObjectPath::try_from(format!("/org/encore/track/{element}"))
        .ok()
        .map(OwnedObjectPath::from)
}

struct RootIface {
    tx: Sender<ControlCmd>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {}

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "encore"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec!["file".into(), "http".into(), "https".into()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        let _ = self.tx.send(ControlCmd::Next);
    }

    fn previous(&self) {
        let _ = self.tx.send(ControlCmd::Prev);
    }

    fn play(&self) {
        let _ = self.tx.send(ControlCmd::Play);
    }

    fn pause(&self) {
        let _ = self.tx.send(ControlCmd::Pause);
    }

    fn play_pause(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    fn stop(&self) {
        let _ = self.tx.send(ControlCmd::Stop);
    }

    fn seek(&self, offset: i64) {
        let _ = self.tx.send(ControlCmd::SeekBy { micros: offset });
    }

    /// Ignored unless `track_id` is the current track and `position` lies
    /// within it.
    fn set_position(&self, track_id: OwnedObjectPath, position: i64) {
        let accepted = self.state.lock().is_ok_and(|s| {
            let same_track = s
                .track_id
                .as_ref()
                .is_some_and(|id| id.as_str() == track_id.as_str());
            let in_range = position >= 0 && s.length_micros.is_none_or(|len| position <= len);
            same_track && in_range
        });
        if accepted {
            let _ = self.tx.send(ControlCmd::SetPosition { micros: position });
        }
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        self.state
            .lock()
            .map(|s| s.playback.as_str())
            .unwrap_or("Stopped")
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn position(&self) -> i64 {
        self.state.lock().map(|s| s.position_micros).unwrap_or(0)
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let mut map = HashMap::new();
        let Ok(s) = self.state.lock() else {
            return map;
        };

        if let Some(id) = &s.track_id {
            insert(&mut map, "mpris:trackid", id.clone().into_inner());
        }
        if let Some(title) = &s.title {
            insert(&mut map, "xesam:title", title.clone());
        }
        if !s.artist.is_empty() {
            insert(&mut map, "xesam:artist", s.artist.clone());
        }
        if let Some(album) = &s.album {
            insert(&mut map, "xesam:album", album.clone());
        }
        if !s.genre.is_empty() {
            insert(&mut map, "xesam:genre", s.genre.clone());
        }
        if let Some(url) = &s.url {
            insert(&mut map, "xesam:url", url.clone());
        }
        if let Some(art) = &s.art_url {
            insert(&mut map, "mpris:artUrl", art.clone());
        }
        if let Some(len) = s.length_micros {
            insert(&mut map, "mpris:length", len);
        }
        map
    }
}

fn insert<'a>(map: &mut HashMap<String, OwnedValue>, key: &str, value: impl Into<Value<'a>>) {
    if let Ok(v) = OwnedValue::try_from(value.into()) {
        map.insert(key.to_string(), v);
    }
}

async fn emit_changed(connection: &Connection) -> zbus::Result<()> {
    let iface_ref = connection
        .object_server()
        .interface::<_, PlayerIface>(OBJECT_PATH)
        .await?;
    let iface = iface_ref.get().await;
    let emitter = iface_ref.signal_emitter();
    iface.playback_status_changed(emitter).await?;
    iface.metadata_changed(emitter).await?;
    Ok(())
}

async fn serve(
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
    notify: Receiver<()>,
) -> zbus::Result<()> {
    let connection = Connection::session().await?;
    connection.request_name(BUS_NAME).await?;

    let object_server = connection.object_server();
    object_server
        .at(OBJECT_PATH, RootIface { tx: tx.clone() })
        .await?;
    object_server
        .at(OBJECT_PATH, PlayerIface { tx, state })
        .await?;
    tracing::info!(name = BUS_NAME, "MPRIS service registered");

    loop {
        Timer::after(Duration::from_millis(200)).await;

        let mut changed = false;
        loop {
            match notify.try_recv() {
                Ok(()) => changed = true,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }
        if changed {
            if let Err(e) = emit_changed(&connection).await {
                tracing::debug!("MPRIS: failed to emit PropertiesChanged: {e}");
            }
        }
    }
}

/// Register on the session bus from a background thread.
///
/// Failing to reach the bus only disables media keys.
pub fn spawn_mpris(tx: Sender<ControlCmd>) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (notify_tx, notify_rx) = mpsc::channel::<()>();

    let state_for_thread = state.clone();
    std::thread::spawn(move || {
        if let Err(e) = block_on(serve(tx, state_for_thread, notify_rx)) {
            tracing::warn!("MPRIS unavailable: {e}");
        }
    });

    MprisHandle {
        state,
        notify: notify_tx,
    }
}
