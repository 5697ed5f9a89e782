use crate::app::App;
use crate::mpris::{MprisHandle, PlaybackStatus};

pub fn update_mpris(mpris: &MprisHandle, app: &App) {
    mpris.set_track_metadata(app.now_playing.as_ref());
    mpris.set_playback(PlaybackStatus::from_phase(app.phase, app.is_playing));
}
