//! Default configuration constants for stagecue.
//!
//! Shared constants used across configuration types to ensure consistency
//! and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Default RMS threshold for detecting speech (0.0 to 1.0).
///
/// Frames whose normalized RMS energy exceeds this value count as speech
/// and push the silence window forward.
pub const SILENCE_THRESHOLD: f32 = 0.01;

/// Default silence duration in milliseconds before an utterance is flushed.
///
/// One second allows natural pauses within a spoken line without splitting
/// it into separate utterances.
pub const SILENCE_DURATION_MS: u64 = 1000;

/// Default cooldown between accepted cue matches, in milliseconds.
///
/// Prevents a cue from re-triggering on residual audio picked up from
/// the playback itself.
pub const MATCH_COOLDOWN_MS: u64 = 5000;

/// Number of leading transcript tokens used for cue matching.
pub const PROBE_TOKENS: usize = 2;

/// Maximum number of transcript entries retained in history.
pub const HISTORY_CAPACITY: usize = 100;

/// Default directory holding the pre-recorded cue audio files.
pub const AUDIO_DIR: &str = "audio";

/// Default path of the persisted cue table.
pub const CUES_FILE: &str = "script_cues.json";

/// Default language code for transcription.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Default Whisper model path.
pub const DEFAULT_MODEL_PATH: &str = "models/ggml-base.bin";

/// Capture polling interval in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 16;

/// Queue receive timeout in milliseconds.
///
/// Doubles as the cancellation-check cadence for every pipeline worker, so
/// shutdown latency is bounded by this value.
pub const RECV_TIMEOUT_MS: u64 = 100;

/// Audio frame queue capacity. Oldest frames are dropped under overload
/// since stale real-time audio is worse than lost audio.
pub const FRAME_BUFFER: usize = 256;

/// Utterance queue capacity.
pub const UTTERANCE_BUFFER: usize = 8;

/// Transcript queue capacity.
pub const TRANSCRIPT_BUFFER: usize = 16;

/// Playback queue capacity. Producers block when full so cues are never
/// silently skipped.
pub const PLAYBACK_BUFFER: usize = 16;

/// Event bus capacity for slow observers.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Consecutive capture read failures tolerated before capture halts.
pub const MAX_CONSECUTIVE_READ_ERRORS: u32 = 10;
