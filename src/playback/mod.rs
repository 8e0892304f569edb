//! Audio playback engines.
//!
//! Playback is always issued non-blocking: `play` returns as soon as the
//! audio has been handed to the engine, optionally with a duration estimate
//! so the dispatcher can emit a best-effort finished notification.

pub mod command;
#[cfg(feature = "rodio-playback")]
pub mod rodio;

use crate::error::{Result, StagecueError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use command::CommandPlayer;
#[cfg(feature = "rodio-playback")]
pub use rodio::RodioPlayer;

/// Trait for audio playback backends.
pub trait PlaybackEngine: Send + Sync {
    /// Begin playing the file without waiting for completion.
    ///
    /// Returns the estimated playback duration when the engine knows it.
    fn play(&self, path: &Path) -> Result<Option<Duration>>;

    /// Name for logging/debugging.
    fn name(&self) -> &'static str;
}

/// Mock playback engine for testing.
#[derive(Debug, Clone, Default)]
pub struct MockPlayer {
    played: Arc<Mutex<Vec<PathBuf>>>,
    should_fail: bool,
    duration: Option<Duration>,
}

impl MockPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the mock to fail on play.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Configure the duration estimate the mock reports.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Paths played so far, in order.
    pub fn played(&self) -> Vec<PathBuf> {
        self.played
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl PlaybackEngine for MockPlayer {
    fn play(&self, path: &Path) -> Result<Option<Duration>> {
        if self.should_fail {
            return Err(StagecueError::Playback {
                message: "mock playback failure".to_string(),
            });
        }
        self.played
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(path.to_path_buf());
        Ok(self.duration)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Reads a WAV header to estimate playback duration.
///
/// Used as a fallback when the engine itself reports none; non-WAV files
/// simply yield no estimate.
pub fn wav_duration(path: &Path) -> Option<Duration> {
    let reader = hound::WavReader::open(path).ok()?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return None;
    }
    let frames = reader.duration();
    Some(Duration::from_secs_f64(
        frames as f64 / spec.sample_rate as f64,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn mock_records_played_paths_in_order() {
        let player = MockPlayer::new();
        player.play(Path::new("a.wav")).unwrap();
        player.play(Path::new("b.wav")).unwrap();

        assert_eq!(
            player.played(),
            vec![PathBuf::from("a.wav"), PathBuf::from("b.wav")]
        );
    }

    #[test]
    fn mock_failure_reports_playback_error() {
        let player = MockPlayer::new().with_failure();
        assert!(matches!(
            player.play(Path::new("a.wav")),
            Err(StagecueError::Playback { .. })
        ));
        assert!(player.played().is_empty());
    }

    #[test]
    fn mock_reports_configured_duration() {
        let player = MockPlayer::new().with_duration(Duration::from_secs(3));
        let estimate = player.play(Path::new("a.wav")).unwrap();
        assert_eq!(estimate, Some(Duration::from_secs(3)));
    }

    #[test]
    fn wav_duration_reads_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..16000 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let duration = wav_duration(&path).unwrap();
        assert!((duration.as_secs_f64() - 1.0).abs() < 0.01);
    }

    #[test]
    fn wav_duration_of_non_wav_is_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "not audio").unwrap();
        assert_eq!(wav_duration(&path), None);
    }

    #[test]
    fn wav_duration_of_missing_file_is_none() {
        assert_eq!(wav_duration(Path::new("/nonexistent/missing.wav")), None);
    }
}
