//! Playback through an external player process.
//!
//! Spawns the configured player per file and returns immediately; a small
//! reaper thread waits on the child so nothing zombies. Works on any box
//! with a command-line player installed and needs no audio libraries at
//! build time.

use crate::error::{Result, StagecueError};
use crate::playback::PlaybackEngine;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

/// Default player command per platform.
fn default_player() -> &'static str {
    if cfg!(target_os = "macos") {
        "afplay"
    } else {
        "aplay"
    }
}

/// Plays audio by spawning an external player command.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    command: String,
}

impl CommandPlayer {
    /// Creates a player using the given command, or the platform default.
    pub fn new(command: Option<String>) -> Self {
        Self {
            command: command.unwrap_or_else(|| default_player().to_string()),
        }
    }

    /// The player command in use.
    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Default for CommandPlayer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PlaybackEngine for CommandPlayer {
    fn play(&self, path: &Path) -> Result<Option<Duration>> {
        let mut child = Command::new(&self.command)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| StagecueError::Playback {
                message: format!("failed to spawn {}: {}", self.command, e),
            })?;

        // Reap the child off-thread so play() never blocks on the audio.
        std::thread::spawn(move || {
            child.wait().ok();
        });

        Ok(None)
    }

    fn name(&self) -> &'static str {
        "command"
    }
}
