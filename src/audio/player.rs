use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::AudioSettings;
use crate::library::MediaSource;

use super::output::AudioOutput;
use super::sink::check_source;
use super::thread::spawn_audio_thread;
use super::types::{AudioCmd, AudioError, AudioEvent, PlaybackHandle, PlaybackInfo};

/// `AudioOutput` backed by `rodio`.
///
/// A command proxy: the stream and sink live on a worker thread, this handle
/// only forwards commands and reads the shared position.
pub struct RodioOutput {
    tx: Sender<AudioCmd>,
    playback: PlaybackHandle,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl RodioOutput {
    /// Open the default output device. Lifecycle events go to `events`.
    pub fn new(settings: AudioSettings, events: Sender<AudioEvent>) -> Result<Self, AudioError> {
        let (tx, rx) = mpsc::channel::<AudioCmd>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let playback: PlaybackHandle = Arc::new(Mutex::new(PlaybackInfo::default()));

        let handle = spawn_audio_thread(rx, events, playback.clone(), settings, ready_tx);

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e);
            }
            Err(_) => return Err(AudioError::Disconnected),
        }

        Ok(Self {
            tx,
            playback,
            join: Mutex::new(Some(handle)),
        })
    }

    fn send(&self, cmd: AudioCmd) -> Result<(), AudioError> {
        self.tx.send(cmd).map_err(|_| AudioError::Disconnected)
    }

    /// Fade out over `fade_out`, stop the worker and wait for it.
    pub fn quit_softly(&self, fade_out: Duration) {
        let _ = self.send(AudioCmd::Quit {
            fade_out_ms: fade_out.as_millis() as u64,
        });

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        self.quit_softly(Duration::ZERO);
    }
}

impl AudioOutput for RodioOutput {
    fn load(&mut self, source: &MediaSource) -> Result<(), AudioError> {
        check_source(source)?;
        self.send(AudioCmd::Load(source.clone()))
    }

    fn play(&mut self) -> Result<(), AudioError> {
        self.send(AudioCmd::Play)
    }

    fn pause(&mut self) -> Result<(), AudioError> {
        self.send(AudioCmd::Pause)
    }

    fn seek(&mut self, seconds: f64) -> Result<(), AudioError> {
        self.send(AudioCmd::Seek(seconds))
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), AudioError> {
        self.send(AudioCmd::SetVolume(volume))
    }

    fn elapsed(&self) -> f64 {
        self.playback
            .lock()
            .map(|info| info.elapsed.as_secs_f64())
            .unwrap_or(0.0)
    }
}
