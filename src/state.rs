//! Shared run state.
//!
//! One `ShowState` owns everything the matcher and the control surface both
//! touch: the run-state machine, the cue table, the current-cue pointer,
//! match timestamps, counters, and the bounded transcript history. It lives
//! behind a single mutex; no field is ever shared raw between writers, so
//! the matcher and manual controls can never interleave partial updates.

use crate::cue::Cue;
use crate::defaults;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Overall run state machine.
///
/// `start()` is only valid from `Stopped`, `stop()` only from `Running`;
/// the transitional states exist so a second caller racing a start or stop
/// gets a clean invalid-state error instead of a half-spawned pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Stopped => "stopped",
            RunState::Starting => "starting",
            RunState::Running => "running",
            RunState::Stopping => "stopping",
        }
    }
}

/// Detection and match counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Transcripts that reached the matcher.
    pub detections: u64,
    /// Transcripts that matched a cue.
    pub matches: u64,
}

/// One transcript as recorded in history, annotated after matching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub id: u64,
    pub text: String,
    pub timestamp_ms: u64,
    pub matched_cue: Option<u64>,
    pub played_audio: Option<String>,
}

/// Bounded FIFO of transcript entries. Oldest entries are evicted once the
/// capacity is reached; insertion order is preserved.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<TranscriptEntry>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an entry, evicting the oldest when full.
    pub fn push(&mut self, entry: TranscriptEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Annotates the most recent entry with its match result.
    pub fn annotate_last(&mut self, cue_id: u64, played_audio: &str) {
        if let Some(entry) = self.entries.back_mut() {
            entry.matched_cue = Some(cue_id);
            entry.played_audio = Some(played_audio.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of all entries, oldest first.
    pub fn entries(&self) -> Vec<TranscriptEntry> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(defaults::HISTORY_CAPACITY)
    }
}

/// The single authoritative store for run state. Always accessed through
/// [`SharedState`]; every operation takes the lock for its whole duration.
#[derive(Debug)]
pub struct ShowState {
    pub run_state: RunState,
    pub recording: bool,
    pub cues: Vec<Cue>,
    /// Position of the current cue in the table, `None` when unset.
    pub current_cue_index: Option<usize>,
    pub last_played_cue_id: Option<u64>,
    last_match_time: Option<Instant>,
    pub counters: Counters,
    pub start_time: Option<Instant>,
    pub history: History,
    next_entry_id: u64,
}

impl ShowState {
    pub fn new(cues: Vec<Cue>) -> Self {
        Self {
            run_state: RunState::Stopped,
            recording: false,
            cues,
            current_cue_index: None,
            last_played_cue_id: None,
            last_match_time: None,
            counters: Counters::default(),
            start_time: None,
            history: History::default(),
            next_entry_id: 0,
        }
    }

    pub fn last_match_time(&self) -> Option<Instant> {
        self.last_match_time
    }

    /// Advances the last-match timestamp. It never moves backwards.
    pub fn touch_match_time(&mut self, now: Instant) {
        self.last_match_time = Some(match self.last_match_time {
            Some(previous) if previous > now => previous,
            _ => now,
        });
    }

    /// Hands out the next history entry id.
    pub fn next_entry_id(&mut self) -> u64 {
        let id = self.next_entry_id;
        self.next_entry_id += 1;
        id
    }

    /// Position of a cue in the table by id.
    pub fn cue_position(&self, id: u64) -> Option<usize> {
        self.cues.iter().position(|cue| cue.id == id)
    }

    /// Resets the current-cue pointer if a table mutation invalidated it.
    pub fn clamp_cue_index(&mut self) {
        if let Some(index) = self.current_cue_index {
            if index >= self.cues.len() {
                self.current_cue_index = None;
            }
        }
    }

    /// Wire representation of the cue pointer: -1 when unset.
    pub fn cue_index_wire(&self) -> i64 {
        self.current_cue_index.map(|i| i as i64).unwrap_or(-1)
    }
}

/// Handle shared between the pipeline and the control surface.
pub type SharedState = Arc<Mutex<ShowState>>;

/// Builds a fresh shared state around the given cue table.
pub fn shared(cues: Vec<Cue>) -> SharedState {
    Arc::new(Mutex::new(ShowState::new(cues)))
}
