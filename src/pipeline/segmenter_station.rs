//! Energy-based utterance segmentation.
//!
//! Accumulates frames and tracks the last moment speech energy was seen.
//! Once the buffer is non-empty and silence has lasted longer than the
//! configured window, the whole buffer is flushed as one utterance. The
//! flush check runs after every frame and on idle wakes, so a trailing
//! utterance still comes out when the stream stops feeding frames.

use crate::audio::level::rms;
use crate::clock::Clock;
use crate::defaults;
use crate::pipeline::error::StationError;
use crate::pipeline::station::Station;
use crate::pipeline::types::{AudioFrame, Utterance};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Segmenter tuning.
#[derive(Debug, Clone, Copy)]
pub struct SegmenterConfig {
    /// RMS energy above which a frame counts as speech.
    pub silence_threshold: f32,
    /// Silence needed before the buffer is flushed as an utterance.
    pub silence_duration: Duration,
    /// Drop the samples accumulated after the last voiced frame.
    ///
    /// Off by default: the trailing silence is part of the utterance, and
    /// some engines transcribe better with the padding left in.
    pub trim_trailing_silence: bool,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            silence_threshold: defaults::SILENCE_THRESHOLD,
            silence_duration: Duration::from_millis(defaults::SILENCE_DURATION_MS),
            trim_trailing_silence: false,
        }
    }
}

/// Station that turns a frame stream into silence-delimited utterances.
pub struct SegmenterStation {
    config: SegmenterConfig,
    clock: Arc<dyn Clock>,
    buffer: Vec<i16>,
    /// Buffer length at the end of the last voiced frame.
    voiced_len: usize,
    started_at: Option<Instant>,
    last_speech_time: Instant,
}

impl SegmenterStation {
    pub fn new(config: SegmenterConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            config,
            clock,
            buffer: Vec::new(),
            voiced_len: 0,
            started_at: None,
            last_speech_time: now,
        }
    }

    fn maybe_flush(&mut self, now: Instant) -> Option<Utterance> {
        if self.buffer.is_empty() {
            return None;
        }
        if now.duration_since(self.last_speech_time) <= self.config.silence_duration {
            return None;
        }

        let mut samples = std::mem::take(&mut self.buffer);
        if self.config.trim_trailing_silence && self.voiced_len > 0 {
            samples.truncate(self.voiced_len);
        }

        let started_at = self.started_at.take().unwrap_or(now);
        self.voiced_len = 0;
        self.last_speech_time = now;

        Some(Utterance {
            samples,
            started_at,
            ended_at: now,
        })
    }
}

impl Station for SegmenterStation {
    type Input = AudioFrame;
    type Output = Utterance;

    fn name(&self) -> &'static str {
        "segmenter"
    }

    fn process(&mut self, frame: AudioFrame) -> Result<Option<Utterance>, StationError> {
        let now = self.clock.now();

        if !frame.samples.is_empty() {
            if self.buffer.is_empty() {
                self.started_at = Some(frame.timestamp);
            }
            self.buffer.extend_from_slice(&frame.samples);

            if rms(&frame.samples) > self.config.silence_threshold {
                self.last_speech_time = now;
                self.voiced_len = self.buffer.len();
            }
        }

        Ok(self.maybe_flush(now))
    }

    fn idle(&mut self) -> Result<Option<Utterance>, StationError> {
        let now = self.clock.now();
        Ok(self.maybe_flush(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;

    const FRAME_MS: u64 = 200;
    const FRAME_SAMPLES: usize = 3200; // 200ms at 16kHz

    fn config() -> SegmenterConfig {
        SegmenterConfig {
            silence_threshold: 0.01,
            silence_duration: Duration::from_secs(1),
            trim_trailing_silence: false,
        }
    }

    fn station(clock: &MockClock, config: SegmenterConfig) -> SegmenterStation {
        SegmenterStation::new(config, Arc::new(clock.clone()))
    }

    fn loud_frame(clock: &MockClock, sequence: u64) -> AudioFrame {
        AudioFrame::new(vec![5000i16; FRAME_SAMPLES], clock.now(), sequence)
    }

    fn quiet_frame(clock: &MockClock, sequence: u64) -> AudioFrame {
        AudioFrame::new(vec![0i16; FRAME_SAMPLES], clock.now(), sequence)
    }

    /// Delivers one frame at its arrival time: the clock advances by the
    /// frame duration first, then the frame is processed.
    fn feed(
        station: &mut SegmenterStation,
        clock: &MockClock,
        frame: AudioFrame,
    ) -> Option<Utterance> {
        clock.advance(Duration::from_millis(FRAME_MS));
        station.process(frame).unwrap()
    }

    #[test]
    fn speech_then_silence_emits_one_full_span_utterance() {
        let clock = MockClock::new();
        let mut station = station(&clock, config());

        // 2.0s of speech followed by 1.2s of below-threshold audio.
        let mut flushed = Vec::new();
        for i in 0..10 {
            if let Some(u) = feed(&mut station, &clock, loud_frame(&clock, i)) {
                flushed.push(u);
            }
        }
        for i in 10..16 {
            if let Some(u) = feed(&mut station, &clock, quiet_frame(&clock, i)) {
                flushed.push(u);
            }
        }

        // Exactly one utterance covering the whole 3.2s window.
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].samples.len(), 16 * FRAME_SAMPLES);

        // Buffer reset: the next frames start from empty.
        for i in 16..20 {
            assert!(feed(&mut station, &clock, quiet_frame(&clock, i)).is_none());
        }
    }

    #[test]
    fn silence_only_never_flushes_an_empty_buffer() {
        let clock = MockClock::new();
        let mut station = station(&clock, config());

        // Only empty reads: nothing buffered, nothing flushed, even after
        // long idle periods.
        clock.advance(Duration::from_secs(10));
        assert!(station.idle().unwrap().is_none());
    }

    #[test]
    fn pauses_shorter_than_the_window_do_not_split_an_utterance() {
        let clock = MockClock::new();
        let mut station = station(&clock, config());

        for i in 0..5 {
            assert!(feed(&mut station, &clock, loud_frame(&clock, i)).is_none());
        }
        // 0.5s pause, below the 1.0s window.
        for i in 5..10 {
            assert!(feed(&mut station, &clock, quiet_frame(&clock, i)).is_none());
        }
        // Speech resumes, then a real silence gap.
        for i in 10..15 {
            assert!(feed(&mut station, &clock, loud_frame(&clock, i)).is_none());
        }
        let mut flushed = None;
        for i in 15..27 {
            if let Some(u) = feed(&mut station, &clock, quiet_frame(&clock, i)) {
                flushed = Some(u);
                break;
            }
        }

        let utterance = flushed.expect("utterance should flush after the silence window");
        // One utterance containing both speech bursts and the short pause.
        assert!(utterance.samples.len() >= 15 * FRAME_SAMPLES);
    }

    #[test]
    fn idle_wake_flushes_a_trailing_utterance() {
        let clock = MockClock::new();
        let mut station = station(&clock, config());

        for i in 0..10 {
            assert!(feed(&mut station, &clock, loud_frame(&clock, i)).is_none());
        }

        // Stream stops; no more frames arrive. The idle hook must still
        // flush once the silence window elapses.
        clock.advance(Duration::from_millis(1100));
        let utterance = station.idle().unwrap().expect("trailing flush");
        assert_eq!(utterance.samples.len(), 10 * FRAME_SAMPLES);

        // And only once.
        clock.advance(Duration::from_secs(5));
        assert!(station.idle().unwrap().is_none());
    }

    #[test]
    fn trim_trailing_silence_drops_unvoiced_tail() {
        let clock = MockClock::new();
        let mut cfg = config();
        cfg.trim_trailing_silence = true;
        let mut station = station(&clock, cfg);

        for i in 0..10 {
            feed(&mut station, &clock, loud_frame(&clock, i));
        }
        let mut flushed = None;
        for i in 10..22 {
            if let Some(u) = feed(&mut station, &clock, quiet_frame(&clock, i)) {
                flushed = Some(u);
                break;
            }
        }

        let utterance = flushed.expect("utterance should flush");
        // Only the voiced prefix survives.
        assert_eq!(utterance.samples.len(), 10 * FRAME_SAMPLES);
    }

    #[test]
    fn utterance_timestamps_span_first_frame_to_flush() {
        let clock = MockClock::new();
        let mut station = station(&clock, config());

        let first_frame_at = clock.now();
        for i in 0..5 {
            feed(&mut station, &clock, loud_frame(&clock, i));
        }
        clock.advance(Duration::from_millis(1100));
        let utterance = station.idle().unwrap().expect("flush");

        assert_eq!(utterance.started_at, first_frame_at);
        assert_eq!(utterance.ended_at, clock.now());
    }

    #[test]
    fn empty_frames_do_not_start_an_utterance() {
        let clock = MockClock::new();
        let mut station = station(&clock, config());

        let empty = AudioFrame::new(Vec::new(), clock.now(), 0);
        assert!(station.process(empty).unwrap().is_none());
        clock.advance(Duration::from_secs(2));
        assert!(station.idle().unwrap().is_none());
    }
}
