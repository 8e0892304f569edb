//! Script cues: the persisted table of lines to match and the audio they trigger.

pub mod matcher;
pub mod store;

use crate::error::{Result, StagecueError};
use serde::{Deserialize, Serialize};

/// A scripted line with a prefix-token signature and an associated audio
/// resource played when the line is detected.
///
/// Ids are assigned by the caller and must be unique within the table;
/// they are never regenerated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cue {
    pub id: u64,
    pub source_text: String,
    pub first_tokens: Vec<String>,
    pub audio_reference: String,
}

impl Cue {
    /// Validates required fields for CRUD operations.
    pub fn validate(&self) -> Result<()> {
        if self.source_text.trim().is_empty() {
            return Err(StagecueError::Validation {
                message: "source_text must not be empty".to_string(),
            });
        }
        if self.first_tokens.is_empty() {
            return Err(StagecueError::Validation {
                message: "first_tokens must not be empty".to_string(),
            });
        }
        if self
            .first_tokens
            .iter()
            .any(|t| t.trim().is_empty() || t.contains(char::is_whitespace))
        {
            return Err(StagecueError::Validation {
                message: "first_tokens must be single non-empty words".to_string(),
            });
        }
        if self.audio_reference.trim().is_empty() {
            return Err(StagecueError::Validation {
                message: "audio_reference must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cue() -> Cue {
        Cue {
            id: 1,
            source_text: "नमस्ते दोस्तों".to_string(),
            first_tokens: vec!["hello".to_string(), "friends".to_string()],
            audio_reference: "line_01.wav".to_string(),
        }
    }

    #[test]
    fn valid_cue_passes_validation() {
        assert!(sample_cue().validate().is_ok());
    }

    #[test]
    fn empty_source_text_is_rejected() {
        let mut cue = sample_cue();
        cue.source_text = "   ".to_string();
        assert!(matches!(
            cue.validate(),
            Err(StagecueError::Validation { .. })
        ));
    }

    #[test]
    fn empty_first_tokens_is_rejected() {
        let mut cue = sample_cue();
        cue.first_tokens.clear();
        assert!(matches!(
            cue.validate(),
            Err(StagecueError::Validation { .. })
        ));
    }

    #[test]
    fn multi_word_token_is_rejected() {
        let mut cue = sample_cue();
        cue.first_tokens = vec!["hello world".to_string()];
        assert!(matches!(
            cue.validate(),
            Err(StagecueError::Validation { .. })
        ));
    }

    #[test]
    fn empty_audio_reference_is_rejected() {
        let mut cue = sample_cue();
        cue.audio_reference = String::new();
        assert!(matches!(
            cue.validate(),
            Err(StagecueError::Validation { .. })
        ));
    }

    #[test]
    fn cue_json_roundtrip_preserves_non_ascii() {
        let cue = sample_cue();
        let json = serde_json::to_string(&cue).unwrap();
        let parsed: Cue = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cue);
        assert!(json.contains("नमस्ते"));
    }
}
