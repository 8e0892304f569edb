//! Data types flowing through the pipeline.

use std::path::PathBuf;
use std::time::Instant;

/// A frame of raw audio samples with timing information.
///
/// Frames are ephemeral: the segmenter consumes them immediately.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// PCM samples (16-bit signed integers).
    pub samples: Vec<i16>,
    /// Timestamp when this frame was captured.
    pub timestamp: Instant,
    /// Sequence number for ordering and gap detection.
    pub sequence: u64,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>, timestamp: Instant, sequence: u64) -> Self {
        Self {
            samples,
            timestamp,
            sequence,
        }
    }
}

/// One silence-delimited span of captured audio, ready for transcription.
#[derive(Debug, Clone)]
pub struct Utterance {
    /// Concatenated PCM samples of every frame since the previous flush.
    pub samples: Vec<i16>,
    /// Capture timestamp of the first buffered frame.
    pub started_at: Instant,
    /// Time of the flush that ended the utterance.
    pub ended_at: Instant,
}

/// Transcribed text with its source utterance timing.
#[derive(Debug, Clone)]
pub struct TranscriptResult {
    pub text: String,
    pub utterance_started_at: Instant,
    pub utterance_ended_at: Instant,
    /// When transcription completed.
    pub detected_at: Instant,
}

/// A resolved playback order for the dispatcher.
#[derive(Debug, Clone)]
pub struct PlaybackRequest {
    /// Resolved audio file path.
    pub path: PathBuf,
    /// When the request was issued.
    pub issued_at: Instant,
}

impl PlaybackRequest {
    pub fn new(path: PathBuf, issued_at: Instant) -> Self {
        Self { path, issued_at }
    }
}
