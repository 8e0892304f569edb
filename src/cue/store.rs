//! Persisted cue table.
//!
//! Cues are stored as a pretty-printed UTF-8 JSON array so operators can
//! hand-edit the script between shows. Every mutation rewrites the whole
//! file; callers commit in-memory changes only after the write succeeds.

use crate::cue::Cue;
use crate::error::{Result, StagecueError};
use std::fs;
use std::path::{Path, PathBuf};

/// File-backed cue store.
pub struct CueStore {
    path: PathBuf,
}

impl CueStore {
    /// Creates a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file path this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the full ordered cue table.
    pub fn load(&self) -> Result<Vec<Cue>> {
        let contents =
            fs::read_to_string(&self.path).map_err(|e| StagecueError::Persistence {
                message: format!("failed to read {}: {}", self.path.display(), e),
            })?;
        serde_json::from_str(&contents).map_err(|e| StagecueError::Persistence {
            message: format!("failed to parse {}: {}", self.path.display(), e),
        })
    }

    /// Writes the full ordered cue table, replacing the previous contents.
    pub fn save(&self, cues: &[Cue]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StagecueError::Persistence {
                    message: format!("failed to create {}: {}", parent.display(), e),
                })?;
            }
        }

        let json =
            serde_json::to_string_pretty(cues).map_err(|e| StagecueError::Persistence {
                message: format!("failed to serialize cues: {}", e),
            })?;
        fs::write(&self.path, json).map_err(|e| StagecueError::Persistence {
            message: format!("failed to write {}: {}", self.path.display(), e),
        })
    }
}
