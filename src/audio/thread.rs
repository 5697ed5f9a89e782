use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use rodio::{OutputStream, OutputStreamBuilder, Sink};

use crate::config::AudioSettings;
use crate::library::MediaSource;

use super::sink::{LoadedMedia, create_sink_at, load_media};
use super::types::{AudioCmd, AudioError, AudioEvent, PlaybackHandle};

/// The source the thread is currently playing.
struct Current {
    source: MediaSource,
    media: LoadedMedia,
    sink: Sink,
    /// Position the sink was built at; `sink.get_pos()` counts from here.
    offset: Duration,
    playing: bool,
    ended_sent: bool,
}

impl Current {
    fn elapsed(&self) -> Duration {
        self.offset + self.sink.get_pos()
    }

    /// Rebuild the sink at `at` after it drained; keeps the play/pause state.
    fn rebuild_at(&mut self, stream: &OutputStream, at: Duration, volume: f32) -> Result<(), String> {
        let sink = create_sink_at(stream, &self.media, at)?;
        sink.set_volume(volume);
        if self.playing {
            sink.play();
        }
        self.sink.stop();
        self.sink = sink;
        self.offset = at;
        self.ended_sent = false;
        Ok(())
    }
}

fn fade_out_sink(sink: &Sink, from: f32, fade_out_ms: u64) {
    if fade_out_ms == 0 {
        sink.set_volume(0.0);
        return;
    }
    let steps: u64 = 20;
    let step_ms = (fade_out_ms / steps).max(1);
    for step in 1..=steps {
        let t = step as f32 / steps as f32;
        sink.set_volume(from * (1.0 - t));
        thread::sleep(Duration::from_millis(step_ms));
    }
    sink.set_volume(0.0);
}

fn publish(playback: &PlaybackHandle, elapsed: Duration) {
    if let Ok(mut info) = playback.lock() {
        info.elapsed = elapsed;
    }
}

/// Spawn the thread that owns the output stream.
///
/// `ready` receives exactly one message: `Ok(())` once the device is open, or
/// the reason it could not be.
pub(super) fn spawn_audio_thread(
    rx: Receiver<AudioCmd>,
    events: Sender<AudioEvent>,
    playback: PlaybackHandle,
    settings: AudioSettings,
    ready: Sender<Result<(), AudioError>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut stream = match OutputStreamBuilder::open_default_stream() {
            Ok(s) => s,
            Err(e) => {
                let _ = ready.send(Err(AudioError::Device(e.to_string())));
                return;
            }
        };
        // rodio logs to stderr when the stream is dropped, which would land
        // on top of the terminal UI.
        stream.log_on_drop(false);

        let client = match reqwest::blocking::Client::builder().build() {
            Ok(c) => c,
            Err(e) => {
                let _ = ready.send(Err(AudioError::Device(e.to_string())));
                return;
            }
        };
        let _ = ready.send(Ok(()));

        let tick = Duration::from_millis(settings.tick_ms.max(1));
        let mut current: Option<Current> = None;
        let mut volume: f32 = 1.0;

        loop {
            let event = match rx.recv_timeout(tick) {
                Ok(AudioCmd::Load(source)) => {
                    if let Some(old) = current.take() {
                        old.sink.stop();
                    }
                    publish(&playback, Duration::ZERO);

                    match load_media(&client, &stream, &source) {
                        Ok((media, sink)) => {
                            sink.set_volume(volume);
                            let duration = media.duration.map(|d| d.as_secs_f64());
                            tracing::debug!(%source, ?duration, "source loaded");
                            current = Some(Current {
                                source: source.clone(),
                                media,
                                sink,
                                offset: Duration::ZERO,
                                playing: false,
                                ended_sent: false,
                            });
                            Some(AudioEvent::MetadataLoaded { source, duration })
                        }
                        Err(reason) => {
                            tracing::warn!(%source, "load failed: {reason}");
                            Some(AudioEvent::Error {
                                error: AudioError::UnplayableSource {
                                    locator: source.locator(),
                                    reason,
                                },
                                source,
                            })
                        }
                    }
                }

                Ok(AudioCmd::Play) => {
                    let Some(cur) = current.as_mut() else {
                        continue;
                    };
                    cur.playing = true;
                    if cur.sink.empty() {
                        // Playing a drained source starts it over.
                        if let Err(reason) = cur.rebuild_at(&stream, Duration::ZERO, volume) {
                            cur.playing = false;
                            let source = cur.source.clone();
                            current = None;
                            publish(&playback, Duration::ZERO);
                            let error = AudioError::UnplayableSource {
                                locator: source.locator(),
                                reason,
                            };
                            if events.send(AudioEvent::Error { source, error }).is_err() {
                                break;
                            }
                            continue;
                        }
                    }
                    cur.sink.play();
                    publish(&playback, cur.elapsed());
                    None
                }

                Ok(AudioCmd::Pause) => {
                    if let Some(cur) = current.as_mut() {
                        cur.sink.pause();
                        cur.playing = false;
                        publish(&playback, cur.elapsed());
                    }
                    None
                }

                Ok(AudioCmd::Seek(secs)) => {
                    let Some(cur) = current.as_mut() else {
                        continue;
                    };
                    let target = Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or_default();
                    let outcome = if cur.sink.empty() {
                        cur.rebuild_at(&stream, target, volume)
                    } else {
                        match cur.sink.try_seek(target) {
                            Ok(()) => {
                                // The sink position now reports the absolute target.
                                cur.offset = Duration::ZERO;
                                Ok(())
                            }
                            Err(e) => Err(e.to_string()),
                        }
                    };
                    match outcome {
                        Ok(()) => {
                            cur.ended_sent = false;
                            publish(&playback, cur.elapsed());
                            None
                        }
                        Err(reason) => {
                            tracing::warn!(source = %cur.source, "seek to {secs:.2}s failed: {reason}");
                            None
                        }
                    }
                }

                Ok(AudioCmd::SetVolume(v)) => {
                    volume = v;
                    if let Some(cur) = current.as_ref() {
                        cur.sink.set_volume(v);
                    }
                    None
                }

                Ok(AudioCmd::Quit { fade_out_ms }) => {
                    if let Some(cur) = current.take() {
                        if cur.playing {
                            fade_out_sink(&cur.sink, volume, fade_out_ms);
                        }
                        cur.sink.stop();
                    }
                    publish(&playback, Duration::ZERO);
                    break;
                }

                Err(RecvTimeoutError::Timeout) => {
                    // Periodic progress report and end-of-source detection.
                    let Some(cur) = current.as_mut() else {
                        continue;
                    };
                    if !cur.playing {
                        continue;
                    }
                    if cur.sink.empty() {
                        if cur.ended_sent {
                            continue;
                        }
                        cur.ended_sent = true;
                        cur.playing = false;
                        publish(&playback, cur.elapsed());
                        Some(AudioEvent::Ended {
                            source: cur.source.clone(),
                        })
                    } else {
                        let elapsed = cur.elapsed();
                        publish(&playback, elapsed);
                        Some(AudioEvent::TimeUpdate {
                            source: cur.source.clone(),
                            current: elapsed.as_secs_f64(),
                            duration: cur.media.duration.map_or(0.0, |d| d.as_secs_f64()),
                        })
                    }
                }

                Err(RecvTimeoutError::Disconnected) => break,
            };

            if let Some(event) = event {
                if events.send(event).is_err() {
                    // Nobody is listening any more.
                    break;
                }
            }
        }
    })
}
