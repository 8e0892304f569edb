//! Transcription stage.
//!
//! Feeds each utterance to the speech engine sequentially. Empty results
//! are dropped before they reach the matcher; per-utterance failures are
//! recoverable and cost only that utterance.

use crate::clock::Clock;
use crate::pipeline::error::StationError;
use crate::pipeline::station::Station;
use crate::pipeline::types::{TranscriptResult, Utterance};
use crate::stt::transcriber::Transcriber;
use std::sync::Arc;

/// Station wrapping a [`Transcriber`].
pub struct TranscriberStation {
    engine: Arc<dyn Transcriber>,
    clock: Arc<dyn Clock>,
}

impl TranscriberStation {
    pub fn new(engine: Arc<dyn Transcriber>, clock: Arc<dyn Clock>) -> Self {
        Self { engine, clock }
    }
}

impl Station for TranscriberStation {
    type Input = Utterance;
    type Output = TranscriptResult;

    fn name(&self) -> &'static str {
        "transcriber"
    }

    fn process(&mut self, utterance: Utterance) -> Result<Option<TranscriptResult>, StationError> {
        // A dead engine drops utterances quietly; its failure was already
        // reported once at startup.
        if !self.engine.is_ready() {
            return Ok(None);
        }

        let text = self
            .engine
            .transcribe(&utterance.samples)
            .map_err(|e| StationError::Recoverable(format!("transcription failed: {}", e)))?;

        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        Ok(Some(TranscriptResult {
            text: text.to_string(),
            utterance_started_at: utterance.started_at,
            utterance_ended_at: utterance.ended_at,
            detected_at: self.clock.now(),
        }))
    }
}
