//! Configuration types for Lectern
//!
//! Provides recorder settings and the on-disk configuration file.

mod file;

pub use file::{sample_config, ConfigFile};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::capture::acquire::DEFAULT_SCREEN_FPS;
use crate::encode::DEFAULT_TIMESLICE;
use crate::error::{LecternError, Result};
use crate::types::Quality;

/// Default timer interval
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Runtime recorder configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Requested capture quality (ignored for audio)
    pub quality: Quality,
    /// Capture audio alongside camera/screen video
    pub audio_enabled: bool,
    /// Screen capture frame rate
    pub screen_fps: u32,
    /// How often the encoder flushes a chunk
    pub flush_interval: Duration,
    /// Timer interval driving the elapsed counter
    pub tick_interval: Duration,
    /// Where downloads are written (None = current directory)
    pub download_dir: Option<PathBuf>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            audio_enabled: true,
            screen_fps: DEFAULT_SCREEN_FPS,
            flush_interval: DEFAULT_TIMESLICE,
            tick_interval: DEFAULT_TICK_INTERVAL,
            download_dir: None,
        }
    }
}

impl RecorderConfig {
    /// Set the capture quality
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Enable or disable audio
    pub fn with_audio(mut self, enabled: bool) -> Self {
        self.audio_enabled = enabled;
        self
    }

    /// Set the screen capture frame rate
    pub fn with_screen_fps(mut self, fps: u32) -> Self {
        self.screen_fps = fps;
        self
    }

    /// Set the chunk flush interval
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Set the timer interval
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the download directory
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    /// Directory downloads land in
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Validate configuration, returning warnings for questionable values
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.screen_fps > 60 {
            warnings.push(format!(
                "Screen frame rate {} is above what most displays share; 30 is recommended",
                self.screen_fps
            ));
        }

        if self.flush_interval > Duration::from_secs(10) {
            warnings.push(format!(
                "Flush interval {}ms buffers a lot of data per chunk",
                self.flush_interval.as_millis()
            ));
        }

        if self.tick_interval != DEFAULT_TICK_INTERVAL {
            warnings.push(format!(
                "Tick interval {}ms: elapsed time will not be in seconds",
                self.tick_interval.as_millis()
            ));
        }

        warnings
    }

    /// Validate configuration strictly, rejecting unusable values
    pub fn validate_strict(&self) -> Result<()> {
        if self.screen_fps == 0 {
            return Err(LecternError::config("screen_fps must be at least 1"));
        }
        if self.flush_interval.is_zero() {
            return Err(LecternError::config("flush interval must be non-zero"));
        }
        if self.tick_interval.is_zero() {
            return Err(LecternError::config("tick interval must be non-zero"));
        }
        Ok(())
    }
}
