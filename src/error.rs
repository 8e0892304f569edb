//! Error types for stagecue.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StagecueError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio capture errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    // Transcription errors
    #[error("Transcription engine failed to load: {message}")]
    EngineLoad { message: String },

    #[error("Transcription error: {message}")]
    Transcription { message: String },

    // Playback errors
    #[error("Playback failed: {message}")]
    Playback { message: String },

    // Control-surface errors, returned to callers as typed results
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Persistence failed: {message}")]
    Persistence { message: String },

    // IPC errors
    #[error("IPC socket error: {message}")]
    IpcSocket { message: String },

    #[error("IPC protocol error: {message}")]
    IpcProtocol { message: String },

    #[error("IPC connection failed: {message}")]
    IpcConnection { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, StagecueError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_audio_device_not_found_display() {
        let error = StagecueError::AudioDeviceNotFound {
            device: "default".to_string(),
        };
        assert_eq!(error.to_string(), "Audio device not found: default");
    }

    #[test]
    fn test_audio_capture_display() {
        let error = StagecueError::AudioCapture {
            message: "buffer overflow".to_string(),
        };
        assert_eq!(error.to_string(), "Audio capture failed: buffer overflow");
    }

    #[test]
    fn test_engine_load_display() {
        let error = StagecueError::EngineLoad {
            message: "model missing".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Transcription engine failed to load: model missing"
        );
    }

    #[test]
    fn test_validation_display() {
        let error = StagecueError::Validation {
            message: "first_tokens must not be empty".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Validation failed: first_tokens must not be empty"
        );
    }

    #[test]
    fn test_not_found_display() {
        let error = StagecueError::NotFound {
            message: "cue 42".to_string(),
        };
        assert_eq!(error.to_string(), "Not found: cue 42");
    }

    #[test]
    fn test_invalid_state_display() {
        let error = StagecueError::InvalidState {
            message: "system already running".to_string(),
        };
        assert_eq!(error.to_string(), "Invalid state: system already running");
    }

    #[test]
    fn test_persistence_display() {
        let error = StagecueError::Persistence {
            message: "write failed".to_string(),
        };
        assert_eq!(error.to_string(), "Persistence failed: write failed");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: StagecueError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_str = "invalid = toml = syntax";
        let toml_error = toml::from_str::<toml::Value>(toml_str).unwrap_err();
        let error: StagecueError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<StagecueError>();
        assert_sync::<StagecueError>();
    }
}
