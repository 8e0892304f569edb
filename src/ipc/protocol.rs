//! JSON message protocol for IPC communication between CLI and daemon.

use crate::cue::Cue;
use crate::error::StagecueError;
use crate::state::TranscriptEntry;
use serde::{Deserialize, Serialize};

/// Commands sent by CLI to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Start the show pipeline
    Start,
    /// Stop the show pipeline
    Stop,
    /// Advance to the next cue and play it
    Next,
    /// Step back to the previous cue and play it
    Previous,
    /// Replay the last played cue
    Repeat,
    /// Play an arbitrary cue by id
    Play { cue_id: u64 },
    /// List the cue table
    ListCues,
    /// Append a new cue
    AddCue { cue: Cue },
    /// Replace an existing cue
    UpdateCue { cue_id: u64, cue: Cue },
    /// Remove a cue
    DeleteCue { cue_id: u64 },
    /// Get run status and counters
    Status,
    /// Get the transcript history
    History,
    /// Stream broadcast events until disconnect
    Follow,
    /// Shut down the daemon
    Shutdown,
}

impl Command {
    /// Serialize command to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize command from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Typed error categories returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "validation_error")]
    Validation,
    #[serde(rename = "not_found")]
    NotFound,
    #[serde(rename = "invalid_state")]
    InvalidState,
    #[serde(rename = "persistence_error")]
    Persistence,
    #[serde(rename = "internal_error")]
    Internal,
}

impl From<&StagecueError> for ErrorKind {
    fn from(error: &StagecueError) -> Self {
        match error {
            StagecueError::Validation { .. } => ErrorKind::Validation,
            StagecueError::NotFound { .. } => ErrorKind::NotFound,
            StagecueError::InvalidState { .. } => ErrorKind::InvalidState,
            StagecueError::Persistence { .. } => ErrorKind::Persistence,
            _ => ErrorKind::Internal,
        }
    }
}

/// Responses sent by daemon to CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Command succeeded
    Ok { message: String },
    /// Command succeeded with the affected cue
    Cue { cue: Cue },
    /// The full cue table
    Cues { cues: Vec<Cue> },
    /// Current run status
    Status {
        running: bool,
        recording: bool,
        state: String,
        current_cue_index: i64,
        last_played_cue_id: Option<u64>,
        detections: u64,
        matches: u64,
        uptime_secs: Option<u64>,
    },
    /// Transcript history, oldest first
    History { entries: Vec<TranscriptEntry> },
    /// Typed failure
    Error { kind: ErrorKind, message: String },
}

impl Response {
    /// Serialize response to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize response from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Builds the error response for a control failure.
    pub fn from_error(error: &StagecueError) -> Self {
        Response::Error {
            kind: ErrorKind::from(error),
            message: error.to_string(),
        }
    }
}
