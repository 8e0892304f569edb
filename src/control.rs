//! Manual control surface.
//!
//! Every operation here is serialized against the matcher through the
//! single show-state lock: pointer moves, cue CRUD, and run-state
//! transitions all take the lock for their whole duration. Cue mutations
//! persist write-ahead: the new table goes to disk first and is committed
//! to memory only when the write succeeded, so memory and disk never
//! diverge.

use crate::audio::source::AudioSource;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::cue::Cue;
use crate::cue::matcher::resolve_audio;
use crate::cue::store::CueStore;
use crate::error::{Result, StagecueError};
use crate::events::{Event, EventBus};
use crate::pipeline::orchestrator::{Pipeline, PipelineConfig, PipelineHandle};
use crate::pipeline::segmenter_station::SegmenterConfig;
use crate::pipeline::types::PlaybackRequest;
use crate::playback::PlaybackEngine;
use crate::state::{RunState, SharedState, ShowState, TranscriptEntry};
use crate::stt::transcriber::Transcriber;
use crossbeam_channel::Sender;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Builds a fresh audio source per run.
pub type SourceFactory = Box<dyn Fn() -> Result<Box<dyn AudioSource>> + Send + Sync>;

/// Status snapshot returned by [`Controller::status`].
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub running: bool,
    pub recording: bool,
    pub state: &'static str,
    pub current_cue_index: i64,
    pub last_played_cue_id: Option<u64>,
    pub detections: u64,
    pub matches: u64,
    pub uptime_secs: Option<u64>,
}

/// The one object the transport layer talks to.
pub struct Controller {
    config: Config,
    state: SharedState,
    store: CueStore,
    bus: EventBus,
    transcriber: Arc<dyn Transcriber>,
    player: Arc<dyn PlaybackEngine>,
    source_factory: SourceFactory,
    clock: Arc<dyn Clock>,
    pipeline: Mutex<Option<PipelineHandle>>,
    playback_tx: Mutex<Option<Sender<PlaybackRequest>>>,
}

impl Controller {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        state: SharedState,
        store: CueStore,
        bus: EventBus,
        transcriber: Arc<dyn Transcriber>,
        player: Arc<dyn PlaybackEngine>,
        source_factory: SourceFactory,
    ) -> Self {
        Self {
            config,
            state,
            store,
            bus,
            transcriber,
            player,
            source_factory,
            clock: Arc::new(SystemClock),
            pipeline: Mutex::new(None),
            playback_tx: Mutex::new(None),
        }
    }

    /// Sets a custom clock (for deterministic testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn shared_state(&self) -> SharedState {
        self.state.clone()
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, ShowState>> {
        self.state
            .lock()
            .map_err(|_| StagecueError::Other("show state lock poisoned".to_string()))
    }

    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            segmenter: SegmenterConfig {
                silence_threshold: self.config.audio.silence_threshold,
                silence_duration: Duration::from_millis(self.config.audio.silence_duration_ms),
                trim_trailing_silence: self.config.audio.trim_trailing_silence,
            },
            cooldown: Duration::from_millis(self.config.matcher.cooldown_ms),
            audio_dir: self.config.playback.audio_dir.clone(),
            ..Default::default()
        }
    }

    /// Starts a run: spawns every pipeline stage.
    ///
    /// Only valid from the stopped state; a second start while a run is
    /// live or in transition is an invalid-state error.
    pub fn start(&self) -> Result<()> {
        {
            let mut state = self.lock_state()?;
            if state.run_state != RunState::Stopped {
                return Err(StagecueError::InvalidState {
                    message: "system already running".to_string(),
                });
            }
            state.run_state = RunState::Starting;
        }

        let result = (self.source_factory)().and_then(|source| {
            Pipeline::new(self.pipeline_config())
                .with_clock(self.clock.clone())
                .start(
                    source,
                    self.transcriber.clone(),
                    self.player.clone(),
                    self.state.clone(),
                    self.bus.clone(),
                )
        });

        match result {
            Ok(handle) => {
                {
                    let mut playback_tx = self
                        .playback_tx
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner);
                    *playback_tx = Some(handle.playback_sender());
                }
                {
                    let mut pipeline = self
                        .pipeline
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner);
                    *pipeline = Some(handle);
                }
                {
                    let mut state = self.lock_state()?;
                    state.run_state = RunState::Running;
                    state.recording = true;
                    state.start_time = Some(self.clock.now());
                }
                self.bus.publish(Event::SystemStatus {
                    status: "started".to_string(),
                    message: "System started successfully".to_string(),
                });
                Ok(())
            }
            Err(e) => {
                let mut state = self.lock_state()?;
                state.run_state = RunState::Stopped;
                Err(e)
            }
        }
    }

    /// Stops the current run. Only valid while running.
    pub fn stop(&self) -> Result<()> {
        {
            let mut state = self.lock_state()?;
            if state.run_state != RunState::Running {
                return Err(StagecueError::InvalidState {
                    message: "system is not running".to_string(),
                });
            }
            state.run_state = RunState::Stopping;
        }

        {
            let mut playback_tx = self
                .playback_tx
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *playback_tx = None;
        }
        let handle = {
            let mut pipeline = self
                .pipeline
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            pipeline.take()
        };
        if let Some(handle) = handle {
            handle.stop();
        }

        {
            let mut state = self.lock_state()?;
            state.run_state = RunState::Stopped;
            state.recording = false;
        }
        self.bus.publish(Event::SystemStatus {
            status: "stopped".to_string(),
            message: "System stopped".to_string(),
        });
        Ok(())
    }

    /// Sends a resolved playback request for the cue.
    ///
    /// Called after the state mutation is complete so the lock is never
    /// held across a potentially blocking queue send.
    fn dispatch(&self, cue: &Cue) -> Result<()> {
        let sender = {
            let playback_tx = self
                .playback_tx
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            playback_tx.clone().ok_or_else(|| StagecueError::InvalidState {
                message: "system is not running".to_string(),
            })?
        };

        let path = resolve_audio(&self.config.playback.audio_dir, &cue.audio_reference);
        sender
            .send(PlaybackRequest::new(path, self.clock.now()))
            .map_err(|_| StagecueError::InvalidState {
                message: "playback queue closed".to_string(),
            })
    }

    fn require_running(&self, state: &ShowState) -> Result<()> {
        if state.run_state != RunState::Running {
            return Err(StagecueError::InvalidState {
                message: "system is not running".to_string(),
            });
        }
        Ok(())
    }

    /// Advances the cue pointer and plays the new current cue.
    pub fn next(&self) -> Result<Cue> {
        let cue = {
            let mut state = self.lock_state()?;
            self.require_running(&state)?;

            let next_index = match state.current_cue_index {
                Some(index) => index + 1,
                None => 0,
            };
            if next_index >= state.cues.len() {
                return Err(StagecueError::InvalidState {
                    message: "already at last cue".to_string(),
                });
            }

            let cue = state.cues[next_index].clone();
            state.current_cue_index = Some(next_index);
            state.last_played_cue_id = Some(cue.id);
            let now = self.clock.now();
            state.touch_match_time(now);
            cue
        };

        self.dispatch(&cue)?;
        Ok(cue)
    }

    /// Moves the cue pointer back and plays the new current cue.
    pub fn previous(&self) -> Result<Cue> {
        let cue = {
            let mut state = self.lock_state()?;
            self.require_running(&state)?;

            let previous_index = match state.current_cue_index {
                Some(index) if index > 0 => index - 1,
                _ => {
                    return Err(StagecueError::InvalidState {
                        message: "already at first cue".to_string(),
                    });
                }
            };

            let cue = state.cues[previous_index].clone();
            state.current_cue_index = Some(previous_index);
            state.last_played_cue_id = Some(cue.id);
            let now = self.clock.now();
            state.touch_match_time(now);
            cue
        };

        self.dispatch(&cue)?;
        Ok(cue)
    }

    /// Replays the last played cue. The cue pointer does not move.
    pub fn repeat(&self) -> Result<Cue> {
        let cue = {
            let mut state = self.lock_state()?;
            self.require_running(&state)?;

            let id = state
                .last_played_cue_id
                .ok_or_else(|| StagecueError::InvalidState {
                    message: "no cue has been played yet".to_string(),
                })?;
            let position = state
                .cue_position(id)
                .ok_or_else(|| StagecueError::NotFound {
                    message: format!("last played cue {id} no longer exists"),
                })?;

            let cue = state.cues[position].clone();
            let now = self.clock.now();
            state.touch_match_time(now);
            cue
        };

        self.dispatch(&cue)?;
        Ok(cue)
    }

    /// Plays an arbitrary cue by id, updating the same pointers a voice
    /// match would.
    pub fn play(&self, cue_id: u64) -> Result<Cue> {
        let cue = {
            let mut state = self.lock_state()?;
            self.require_running(&state)?;

            let position = state
                .cue_position(cue_id)
                .ok_or_else(|| StagecueError::NotFound {
                    message: format!("cue {cue_id} not found"),
                })?;

            let cue = state.cues[position].clone();
            state.current_cue_index = Some(position);
            state.last_played_cue_id = Some(cue.id);
            let now = self.clock.now();
            state.touch_match_time(now);
            cue
        };

        self.dispatch(&cue)?;
        Ok(cue)
    }

    /// Snapshot of the cue table.
    pub fn list_cues(&self) -> Result<Vec<Cue>> {
        Ok(self.lock_state()?.cues.clone())
    }

    /// Persists a mutated table, then commits it to memory and notifies
    /// observers. On persistence failure memory is left untouched.
    fn commit_cues(&self, state: &mut ShowState, new_cues: Vec<Cue>) -> Result<()> {
        self.store.save(&new_cues)?;
        state.cues = new_cues;
        state.clamp_cue_index();
        self.bus.publish(Event::CuesUpdated {
            cues: state.cues.clone(),
        });
        Ok(())
    }

    /// Appends a new cue. The id must be unique.
    pub fn add_cue(&self, cue: Cue) -> Result<Cue> {
        cue.validate()?;

        let mut state = self.lock_state()?;
        if state.cue_position(cue.id).is_some() {
            return Err(StagecueError::Validation {
                message: format!("cue id {} already exists", cue.id),
            });
        }

        let mut new_cues = state.cues.clone();
        new_cues.push(cue.clone());
        self.commit_cues(&mut state, new_cues)?;
        Ok(cue)
    }

    /// Replaces an existing cue by id.
    pub fn update_cue(&self, cue_id: u64, cue: Cue) -> Result<Cue> {
        cue.validate()?;

        let mut state = self.lock_state()?;
        let position = state
            .cue_position(cue_id)
            .ok_or_else(|| StagecueError::NotFound {
                message: format!("cue {cue_id} not found"),
            })?;
        if cue.id != cue_id && state.cue_position(cue.id).is_some() {
            return Err(StagecueError::Validation {
                message: format!("cue id {} already exists", cue.id),
            });
        }

        let mut new_cues = state.cues.clone();
        new_cues[position] = cue.clone();
        self.commit_cues(&mut state, new_cues)?;
        Ok(cue)
    }

    /// Removes a cue by id.
    pub fn delete_cue(&self, cue_id: u64) -> Result<()> {
        let mut state = self.lock_state()?;
        let position = state
            .cue_position(cue_id)
            .ok_or_else(|| StagecueError::NotFound {
                message: format!("cue {cue_id} not found"),
            })?;

        let mut new_cues = state.cues.clone();
        new_cues.remove(position);
        self.commit_cues(&mut state, new_cues)
    }

    /// Current run status and counters.
    pub fn status(&self) -> Result<Status> {
        let state = self.lock_state()?;
        let now = self.clock.now();
        Ok(Status {
            running: state.run_state == RunState::Running,
            recording: state.recording,
            state: state.run_state.as_str(),
            current_cue_index: state.cue_index_wire(),
            last_played_cue_id: state.last_played_cue_id,
            detections: state.counters.detections,
            matches: state.counters.matches,
            uptime_secs: state
                .start_time
                .map(|start| now.duration_since(start).as_secs()),
        })
    }

    /// Snapshot of the transcript history, oldest first.
    pub fn history(&self) -> Result<Vec<TranscriptEntry>> {
        Ok(self.lock_state()?.history.entries())
    }
}
