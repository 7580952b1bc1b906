//! Configuration file loading and merging
//!
//! Loads user configuration from `~/.config/lectern/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::RecorderConfig;
use crate::error::{LecternError, Result};
use crate::types::Quality;

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Recording settings
    #[serde(default)]
    pub recording: RecordingSettings,

    /// Output settings
    #[serde(default)]
    pub output: OutputSettings,
}

/// Recording settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSettings {
    /// Capture quality (sd, hd, fullhd)
    #[serde(default = "default_quality")]
    pub quality: String,

    /// Capture audio with camera/screen video
    #[serde(default = "default_true")]
    pub audio: bool,

    /// Screen capture frame rate
    #[serde(default = "default_screen_fps")]
    pub screen_fps: u32,

    /// Chunk flush interval in milliseconds
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Timer interval in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Download directory (empty = current directory)
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
}

fn default_quality() -> String {
    "hd".to_string()
}

fn default_true() -> bool {
    true
}

fn default_screen_fps() -> u32 {
    30
}

fn default_flush_interval_ms() -> u64 {
    1000
}

fn default_tick_interval_ms() -> u64 {
    1000
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            audio: true,
            screen_fps: default_screen_fps(),
            flush_interval_ms: default_flush_interval_ms(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("lectern").join("config.toml")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("lectern")
                .join("config.toml")
        } else {
            PathBuf::from("/etc/lectern/config.toml")
        }
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| LecternError::Config(format!("Failed to read config file: {}", e)))?;

        let config: ConfigFile = toml::from_str(&content)
            .map_err(|e| LecternError::Config(format!("Failed to parse config file: {}", e)))?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration, logging warnings but returning defaults on error
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    LecternError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| LecternError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&path, content)
            .map_err(|e| LecternError::Config(format!("Failed to write config file: {}", e)))?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Build a runtime configuration, validating every field
    pub fn to_recorder_config(&self) -> Result<RecorderConfig> {
        let quality: Quality = self
            .recording
            .quality
            .parse()
            .map_err(LecternError::Config)?;

        let config = RecorderConfig {
            quality,
            audio_enabled: self.recording.audio,
            screen_fps: self.recording.screen_fps,
            flush_interval: Duration::from_millis(self.recording.flush_interval_ms),
            tick_interval: Duration::from_millis(self.recording.tick_interval_ms),
            download_dir: self.output.download_dir.clone(),
        };

        config.validate_strict()?;
        for warning in config.validate() {
            warn!("{}", warning);
        }
        Ok(config)
    }
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# Lectern Configuration

[recording]
# Capture quality for camera and screen: sd (640x480), hd (1280x720), fullhd (1920x1080)
quality = "hd"

# Record audio with camera/screen video (microphone-only recording always has audio)
audio = true

# Screen capture frame rate
screen_fps = 30

# How often the encoder flushes a chunk, in milliseconds
flush_interval_ms = 1000

# Timer interval in milliseconds (elapsed time counts one per interval)
tick_interval_ms = 1000

[output]
# Where downloaded recordings are written (defaults to the current directory)
# download_dir = "/home/me/Lectures"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();
        assert_eq!(config.recording.quality, "hd");
        assert!(config.recording.audio);
        assert!(config.output.download_dir.is_none());
    }

    #[test]
    fn test_sample_config_parses() {
        let config: ConfigFile = toml::from_str(&sample_config()).unwrap();
        assert_eq!(config.recording.quality, "hd");
        assert_eq!(config.recording.flush_interval_ms, 1000);

        let runtime = config.to_recorder_config().unwrap();
        assert_eq!(runtime, RecorderConfig::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ConfigFile = toml::from_str("[recording]\nquality = \"fullhd\"\n").unwrap();
        assert_eq!(config.recording.screen_fps, 30);
        let runtime = config.to_recorder_config().unwrap();
        assert_eq!(runtime.quality, Quality::FullHd);
    }

    #[test]
    fn test_invalid_quality_is_config_error() {
        let config: ConfigFile = toml::from_str("[recording]\nquality = \"8k\"\n").unwrap();
        let err = config.to_recorder_config().unwrap_err();
        assert!(matches!(err, LecternError::Config(_)));
    }
}
