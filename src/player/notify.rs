use std::sync::mpsc::{self, Receiver, Sender};

use crate::library::Track;

use super::error::PlaybackError;
use super::state::{PlayerState, RepeatMode, VolumeTier};

/// State changes published by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    TrackChanged { index: usize, track: Track },
    StateChanged { phase: PlayerState, is_playing: bool },
    Progress { elapsed: f64, duration: Option<f64>, fraction: f64 },
    VolumeChanged { volume: f32, tier: VolumeTier },
    ShuffleChanged(bool),
    RepeatChanged(RepeatMode),
    PlaylistReplaced { tracks: Vec<Track>, current_index: Option<usize> },
    Error(PlaybackError),
}

#[derive(Default)]
pub(super) struct Subscribers {
    senders: Vec<Sender<Notification>>,
}

impl Subscribers {
    pub fn subscribe(&mut self) -> Receiver<Notification> {
        let (tx, rx) = mpsc::channel();
        self.senders.push(tx);
        rx
    }

    /// Deliver to every live subscriber; hung-up receivers are forgotten.
    pub fn publish(&mut self, n: Notification) {
        self.senders.retain(|tx| tx.send(n.clone()).is_ok());
    }
}
