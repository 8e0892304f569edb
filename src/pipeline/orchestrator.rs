//! Pipeline wiring: spawns every stage and owns shutdown.

use crate::audio::source::AudioSource;
use crate::clock::{Clock, SystemClock};
use crate::defaults;
use crate::error::Result;
use crate::events::{Event, EventBus};
use crate::pipeline::error::{BusReporter, ErrorReporter};
use crate::pipeline::matcher_station::MatchStation;
use crate::pipeline::playback_station::PlaybackStation;
use crate::pipeline::segmenter_station::{SegmenterConfig, SegmenterStation};
use crate::pipeline::station::StationRunner;
use crate::pipeline::transcriber_station::TranscriberStation;
use crate::pipeline::types::{AudioFrame, PlaybackRequest};
use crate::playback::PlaybackEngine;
use crate::state::SharedState;
use crate::stt::transcriber::Transcriber;
use crossbeam_channel::{Sender, TrySendError, bounded};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Segmenter configuration
    pub segmenter: SegmenterConfig,
    /// Minimum gap between accepted matches
    pub cooldown: Duration,
    /// Directory cue audio references resolve against
    pub audio_dir: PathBuf,
    /// Channel buffer sizes
    pub frame_buffer: usize,
    pub utterance_buffer: usize,
    pub transcript_buffer: usize,
    pub playback_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segmenter: SegmenterConfig::default(),
            cooldown: Duration::from_millis(defaults::MATCH_COOLDOWN_MS),
            audio_dir: PathBuf::from(defaults::AUDIO_DIR),
            frame_buffer: defaults::FRAME_BUFFER,
            utterance_buffer: defaults::UTTERANCE_BUFFER,
            transcript_buffer: defaults::TRANSCRIPT_BUFFER,
            playback_buffer: defaults::PLAYBACK_BUFFER,
        }
    }
}

/// Handle to a running pipeline.
pub struct PipelineHandle {
    /// Flag to signal shutdown
    running: Arc<AtomicBool>,
    /// Join handles for spawned threads
    threads: Vec<JoinHandle<()>>,
    /// Manual-control entry into the playback queue
    playback_tx: Sender<PlaybackRequest>,
}

impl PipelineHandle {
    /// Returns true if the pipeline is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// A sender the control surface uses to dispatch playback directly.
    pub fn playback_sender(&self) -> Sender<PlaybackRequest> {
        self.playback_tx.clone()
    }

    /// Stops the pipeline.
    ///
    /// Signals shutdown, then waits up to a second for workers to finish.
    /// Workers that miss the deadline are detached and die with the
    /// process; in-flight queue items are dropped, not drained.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        drop(self.playback_tx);

        let deadline = Instant::now() + Duration::from_secs(1);
        let poll_interval = Duration::from_millis(50);

        loop {
            let mut remaining = Vec::new();
            for handle in self.threads.drain(..) {
                if handle.is_finished() {
                    if let Err(panic_info) = handle.join() {
                        let msg = panic_info
                            .downcast_ref::<&str>()
                            .copied()
                            .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
                            .unwrap_or("unknown panic");
                        eprintln!("stagecue: pipeline thread panicked: {msg}");
                    }
                } else {
                    remaining.push(handle);
                }
            }
            self.threads = remaining;

            if self.threads.is_empty() {
                break;
            }

            if Instant::now() >= deadline {
                eprintln!(
                    "stagecue: shutdown timeout, {} thread(s) still running, detaching",
                    self.threads.len()
                );
                break;
            }

            thread::sleep(poll_interval);
        }
    }
}

/// Dubbing pipeline: capture → segmenter → transcriber → matcher → playback.
pub struct Pipeline {
    config: PipelineConfig,
    error_reporter: Option<Arc<dyn ErrorReporter>>,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    /// Creates a new pipeline; errors are reported to the event bus.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            error_reporter: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Sets a custom error reporter.
    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.error_reporter = Some(reporter);
        self
    }

    /// Sets a custom clock (for deterministic testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Starts the pipeline.
    ///
    /// # Arguments
    /// * `audio_source` - Audio capture source
    /// * `transcriber` - Speech-to-text engine
    /// * `player` - Playback backend
    /// * `state` - Shared show state (also written by the control surface)
    /// * `bus` - Event bus every stage publishes to
    pub fn start(
        self,
        mut audio_source: Box<dyn AudioSource>,
        transcriber: Arc<dyn Transcriber>,
        player: Arc<dyn PlaybackEngine>,
        state: SharedState,
        bus: EventBus,
    ) -> Result<PipelineHandle> {
        let running = Arc::new(AtomicBool::new(true));
        let sequence = Arc::new(AtomicU64::new(0));
        let reporter = self
            .error_reporter
            .unwrap_or_else(|| Arc::new(BusReporter::new(bus.clone())));

        // Channels between stations
        let (frame_tx, frame_rx) = bounded(self.config.frame_buffer);
        let (utterance_tx, utterance_rx) = bounded(self.config.utterance_buffer);
        let (transcript_tx, transcript_rx) = bounded(self.config.transcript_buffer);
        let (playback_tx, playback_rx) = bounded(self.config.playback_buffer);
        // Terminal station: the output channel is never written, drop the
        // receiver immediately.
        let (sink_tx, _) = bounded::<()>(1);

        // Stations
        let segmenter = SegmenterStation::new(self.config.segmenter, self.clock.clone());
        let transcriber_station = TranscriberStation::new(transcriber, self.clock.clone());
        let matcher = MatchStation::new(
            state,
            bus.clone(),
            self.clock.clone(),
            self.config.cooldown,
            self.config.audio_dir.clone(),
        );
        let playback_station = PlaybackStation::new(player, bus.clone());

        let segmenter_runner = StationRunner::spawn(
            segmenter,
            frame_rx.clone(),
            utterance_tx,
            running.clone(),
            reporter.clone(),
        );
        let transcriber_runner = StationRunner::spawn(
            transcriber_station,
            utterance_rx,
            transcript_tx,
            running.clone(),
            reporter.clone(),
        );
        let matcher_runner = StationRunner::spawn(
            matcher,
            transcript_rx,
            playback_tx.clone(),
            running.clone(),
            reporter.clone(),
        );
        let playback_runner = StationRunner::spawn(
            playback_station,
            playback_rx,
            sink_tx,
            running.clone(),
            reporter.clone(),
        );

        // Start audio capture before the polling loop begins.
        audio_source.start()?;
        let source_is_finite = audio_source.is_finite();

        // Capture polling thread
        let capture_running = running.clone();
        let capture_bus = bus;
        let capture_handle = thread::spawn(move || {
            let poll_interval = Duration::from_millis(defaults::POLL_INTERVAL_MS);
            let mut consecutive_errors: u32 = 0;

            while capture_running.load(Ordering::SeqCst) {
                let samples = match audio_source.read_samples() {
                    Ok(s) => {
                        consecutive_errors = 0;
                        s
                    }
                    Err(e) => {
                        // Transient device errors are tolerated; capture
                        // halts alone once they look permanent, the rest of
                        // the pipeline stays up for manual control.
                        consecutive_errors += 1;
                        eprintln!("stagecue: audio capture error: {e}");
                        if consecutive_errors >= defaults::MAX_CONSECUTIVE_READ_ERRORS {
                            capture_bus.publish(Event::SystemError {
                                error: format!(
                                    "audio capture failed {consecutive_errors} times in a row: {e}"
                                ),
                            });
                            break;
                        }
                        thread::sleep(poll_interval);
                        continue;
                    }
                };

                if samples.is_empty() {
                    if source_is_finite {
                        // File source exhausted; the segmenter's idle flush
                        // emits the trailing utterance.
                        break;
                    }
                    thread::sleep(poll_interval);
                    continue;
                }

                let frame = AudioFrame::new(
                    samples,
                    Instant::now(),
                    sequence.fetch_add(1, Ordering::Relaxed),
                );

                // Drop-oldest overflow: stale frames are worth less than
                // fresh ones. The channel is MPMC, so the producer holds a
                // receiver clone to evict the head.
                match frame_tx.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(frame)) => {
                        frame_rx.try_recv().ok();
                        if frame_tx.try_send(frame).is_err() {
                            eprintln!("stagecue: frame queue overflow, dropping frame");
                        }
                    }
                    Err(TrySendError::Disconnected(_)) => break,
                }

                thread::sleep(poll_interval);
            }

            if let Err(e) = audio_source.stop() {
                eprintln!("stagecue: failed to stop audio capture: {e}");
            }
        });

        // Collect thread handles, logging panics at join time.
        let mut threads = vec![capture_handle];
        for runner in [
            segmenter_runner,
            transcriber_runner,
            matcher_runner,
            playback_runner,
        ] {
            threads.push(thread::spawn(move || {
                if let Err(msg) = runner.join() {
                    eprintln!("stagecue: {msg}");
                }
            }));
        }

        Ok(PipelineHandle {
            running,
            threads,
            playback_tx,
        })
    }
}
