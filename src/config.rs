use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub stt: SttConfig,
    pub matcher: MatcherConfig,
    pub playback: PlaybackConfig,
    pub store: StoreConfig,
}

/// Audio capture and segmentation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
    pub silence_threshold: f32,
    pub silence_duration_ms: u64,
    pub trim_trailing_silence: bool,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    pub model_path: PathBuf,
    pub language: String,
}

/// Cue matching configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatcherConfig {
    pub cooldown_ms: u64,
}

/// Playback configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Directory that cue audio references are resolved against.
    pub audio_dir: PathBuf,
    /// External player command, when not using in-process playback.
    pub player: Option<String>,
}

/// Cue store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub cues_file: PathBuf,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            silence_threshold: defaults::SILENCE_THRESHOLD,
            silence_duration_ms: defaults::SILENCE_DURATION_MS,
            trim_trailing_silence: false,
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(defaults::DEFAULT_MODEL_PATH),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: defaults::MATCH_COOLDOWN_MS,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            audio_dir: PathBuf::from(defaults::AUDIO_DIR),
            player: None,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cues_file: PathBuf::from(defaults::CUES_FILE),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                let missing = e
                    .downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false);
                if missing { Ok(Self::default()) } else { Err(e) }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - STAGECUE_MODEL → stt.model_path
    /// - STAGECUE_LANGUAGE → stt.language
    /// - STAGECUE_AUDIO_DEVICE → audio.device
    /// - STAGECUE_AUDIO_DIR → playback.audio_dir
    /// - STAGECUE_CUES_FILE → store.cues_file
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("STAGECUE_MODEL") {
            if !model.is_empty() {
                self.stt.model_path = PathBuf::from(model);
            }
        }

        if let Ok(language) = std::env::var("STAGECUE_LANGUAGE") {
            if !language.is_empty() {
                self.stt.language = language;
            }
        }

        if let Ok(device) = std::env::var("STAGECUE_AUDIO_DEVICE") {
            if !device.is_empty() {
                self.audio.device = Some(device);
            }
        }

        if let Ok(dir) = std::env::var("STAGECUE_AUDIO_DIR") {
            if !dir.is_empty() {
                self.playback.audio_dir = PathBuf::from(dir);
            }
        }

        if let Ok(file) = std::env::var("STAGECUE_CUES_FILE") {
            if !file.is_empty() {
                self.store.cues_file = PathBuf::from(file);
            }
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/stagecue/config.toml on Linux
    #[cfg(feature = "cli")]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stagecue")
            .join("config.toml")
    }
}
