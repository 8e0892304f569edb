//! Playback dispatch stage.
//!
//! Consumes playback requests in submission order, verifies the resolved
//! file exists, and issues non-blocking playback. The started event is
//! emitted as soon as the engine accepts the file; the finished event is
//! best effort, timed from a duration estimate when one is available and
//! immediate otherwise.

use crate::events::{Event, EventBus, epoch_ms};
use crate::pipeline::error::StationError;
use crate::pipeline::station::Station;
use crate::pipeline::types::PlaybackRequest;
use crate::playback::{PlaybackEngine, wav_duration};
use std::sync::Arc;

/// Station wrapping a [`PlaybackEngine`].
pub struct PlaybackStation {
    engine: Arc<dyn PlaybackEngine>,
    bus: EventBus,
}

impl PlaybackStation {
    pub fn new(engine: Arc<dyn PlaybackEngine>, bus: EventBus) -> Self {
        Self { engine, bus }
    }
}

impl Station for PlaybackStation {
    // Terminal station: playback is the side effect, nothing flows on.
    type Input = PlaybackRequest;
    type Output = ();

    fn name(&self) -> &'static str {
        "playback"
    }

    fn process(&mut self, request: PlaybackRequest) -> Result<Option<()>, StationError> {
        if !request.path.exists() {
            return Err(StationError::Recoverable(format!(
                "audio file not found: {}",
                request.path.display()
            )));
        }

        let estimate = self
            .engine
            .play(&request.path)
            .map_err(|e| StationError::Recoverable(e.to_string()))?;

        let file = request.path.display().to_string();
        eprintln!("stagecue: playing '{}'", file);
        self.bus.publish(Event::AudioPlaying {
            file: file.clone(),
            timestamp_ms: epoch_ms(),
        });

        let estimate = estimate.or_else(|| wav_duration(&request.path));
        let bus = self.bus.clone();
        match estimate {
            Some(duration) => {
                // Best effort: assume playback ends after the estimated
                // duration. Real hardware completion is not observable here.
                std::thread::spawn(move || {
                    std::thread::sleep(duration);
                    bus.publish(Event::AudioFinished {
                        file,
                        timestamp_ms: epoch_ms(),
                    });
                });
            }
            None => {
                bus.publish(Event::AudioFinished {
                    file,
                    timestamp_ms: epoch_ms(),
                });
            }
        }

        Ok(None)
    }
}
