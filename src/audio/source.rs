//! Audio source abstraction.

use crate::error::{Result, StagecueError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Trait for audio source devices.
///
/// This trait allows swapping implementations (live device, WAV file, mock).
pub trait AudioSource: Send {
    /// Start capturing audio from the source.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio from the source.
    fn stop(&mut self) -> Result<()>;

    /// Read whatever samples have accumulated since the last read.
    ///
    /// An empty vector from a live source means nothing arrived yet; from a
    /// finite source it means the input is exhausted.
    fn read_samples(&mut self) -> Result<Vec<i16>>;

    /// True for sources that end (files, pipes) as opposed to microphones.
    fn is_finite(&self) -> bool;
}

/// One phase of a mock frame sequence: `count` reads each returning `samples`.
#[derive(Debug, Clone)]
pub struct FramePhase {
    pub samples: Vec<i16>,
    pub count: u32,
}

/// Mock audio source for testing.
#[derive(Debug, Clone)]
pub struct MockAudioSource {
    is_started: bool,
    phases: Vec<FramePhase>,
    read_count: Arc<AtomicU32>,
    live: bool,
    should_fail_start: bool,
    should_fail_read: bool,
    error_message: String,
}

impl MockAudioSource {
    /// Create a new mock audio source that returns silence once.
    pub fn new() -> Self {
        Self {
            is_started: false,
            phases: vec![FramePhase {
                samples: vec![0i16; 160],
                count: 1,
            }],
            read_count: Arc::new(AtomicU32::new(0)),
            live: false,
            should_fail_start: false,
            should_fail_read: false,
            error_message: "mock audio error".to_string(),
        }
    }

    /// Configure a sequence of frame phases to play through.
    pub fn with_frame_sequence(mut self, phases: Vec<FramePhase>) -> Self {
        self.phases = phases;
        self
    }

    /// Treat the source as live: empty reads after exhaustion instead of EOF.
    pub fn as_live_source(mut self) -> Self {
        self.live = true;
        self
    }

    /// Configure the mock to fail on start.
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on every read.
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Configure the error message for failures.
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            return Err(StagecueError::AudioCapture {
                message: self.error_message.clone(),
            });
        }
        self.is_started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        if self.should_fail_read {
            return Err(StagecueError::AudioCapture {
                message: self.error_message.clone(),
            });
        }

        let mut read = self.read_count.fetch_add(1, Ordering::Relaxed);
        for phase in &self.phases {
            if read < phase.count {
                return Ok(phase.samples.clone());
            }
            read -= phase.count;
        }
        Ok(Vec::new())
    }

    fn is_finite(&self) -> bool {
        !self.live
    }
}
