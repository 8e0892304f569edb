//! Cue matching stage.
//!
//! Runs once per transcript: records it in history, applies the cooldown
//! gate, scans the cue table in stored order, and on a match updates the
//! shared pointers and enqueues playback. Everything happens under the
//! single show-state lock, so these updates can never interleave with the
//! manual control surface.

use crate::clock::Clock;
use crate::cue::matcher::{find_match, probe, resolve_audio};
use crate::events::{Event, EventBus, epoch_ms};
use crate::pipeline::error::StationError;
use crate::pipeline::station::Station;
use crate::pipeline::types::{PlaybackRequest, TranscriptResult};
use crate::state::{SharedState, TranscriptEntry};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Station that turns transcripts into playback decisions.
pub struct MatchStation {
    state: SharedState,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
    audio_dir: PathBuf,
}

impl MatchStation {
    pub fn new(
        state: SharedState,
        bus: EventBus,
        clock: Arc<dyn Clock>,
        cooldown: Duration,
        audio_dir: PathBuf,
    ) -> Self {
        Self {
            state,
            bus,
            clock,
            cooldown,
            audio_dir,
        }
    }
}

impl Station for MatchStation {
    type Input = TranscriptResult;
    type Output = PlaybackRequest;

    fn name(&self) -> &'static str {
        "matcher"
    }

    fn process(
        &mut self,
        transcript: TranscriptResult,
    ) -> Result<Option<PlaybackRequest>, StationError> {
        let now = self.clock.now();

        let mut state = self
            .state
            .lock()
            .map_err(|_| StationError::Fatal("show state lock poisoned".to_string()))?;

        state.counters.detections += 1;

        let entry = TranscriptEntry {
            id: state.next_entry_id(),
            text: transcript.text.clone(),
            timestamp_ms: epoch_ms(),
            matched_cue: None,
            played_audio: None,
        };
        state.history.push(entry.clone());
        self.bus.publish(Event::TranscriptionDetected { entry });

        // Cooldown gate: the transcript stays in history but is never
        // matched while residual audio from the last hit may still be live.
        if let Some(last) = state.last_match_time() {
            if now.duration_since(last) < self.cooldown {
                eprintln!("stagecue: ignoring transcript during cooldown");
                return Ok(None);
            }
        }

        let probe = probe(&transcript.text);
        let Some(index) = find_match(&state.cues, &probe) else {
            return Ok(None);
        };

        let cue = state.cues[index].clone();
        let path = resolve_audio(&self.audio_dir, &cue.audio_reference);
        let path_display = path.display().to_string();

        state.current_cue_index = Some(index);
        state.last_played_cue_id = Some(cue.id);
        state.touch_match_time(now);
        state.counters.matches += 1;
        state.history.annotate_last(cue.id, &path_display);

        eprintln!(
            "stagecue: matched cue {} -> playing '{}'",
            cue.id, path_display
        );
        self.bus.publish(Event::CueMatched {
            cue,
            transcript: transcript.text,
            timestamp_ms: epoch_ms(),
        });

        Ok(Some(PlaybackRequest::new(path, now)))
    }
}
