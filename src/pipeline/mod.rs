//! Real-time dubbing pipeline.
//!
//! A multi-station pipeline where each station runs in its own thread,
//! connected by bounded crossbeam channels:
//!
//! capture → segmenter → transcriber → matcher → playback
//!
//! Stations block on queue receive with a short timeout; every wake checks
//! the shared shutdown flag, so stop latency is bounded by the receive
//! timeout. Per-item failures are logged and the item dropped; nothing a
//! single utterance or playback does can take the performance down.

pub mod error;
pub mod matcher_station;
pub mod orchestrator;
pub mod playback_station;
pub mod segmenter_station;
pub mod station;
pub mod transcriber_station;
pub mod types;

pub use error::{BusReporter, ErrorReporter, LogReporter, StationError};
pub use matcher_station::MatchStation;
pub use orchestrator::{Pipeline, PipelineConfig, PipelineHandle};
pub use playback_station::PlaybackStation;
pub use segmenter_station::{SegmenterConfig, SegmenterStation};
pub use station::{Station, StationRunner};
pub use transcriber_station::TranscriberStation;
pub use types::{AudioFrame, PlaybackRequest, TranscriptResult, Utterance};
