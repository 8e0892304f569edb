//! stagecue - Voice-triggered audio dubbing for live theatre
//!
//! Listens to live speech, matches it against a scripted cue table, and
//! plays the matching pre-recorded audio, with manual controls for the
//! operator to drive the show by hand.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod clock;
pub mod config;
pub mod control;
pub mod cue;
pub mod daemon;
pub mod defaults;
pub mod error;
pub mod events;
pub mod ipc;
pub mod pipeline;
pub mod playback;
pub mod state;
pub mod stt;

// Core traits (source → pipeline → playback)
pub use audio::source::AudioSource;
pub use playback::PlaybackEngine;
pub use stt::transcriber::Transcriber;

// Pipeline
pub use pipeline::orchestrator::{Pipeline, PipelineConfig, PipelineHandle};

// Control surface
pub use control::Controller;

// Shared state and events
pub use events::{Event, EventBus};
pub use state::{RunState, SharedState, ShowState};

// Error handling
pub use error::{Result, StagecueError};

// Config
pub use config::Config;

// Station framework (for advanced users)
pub use pipeline::error::{ErrorReporter, StationError};
pub use pipeline::station::Station;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }
}
