//! Core types for Lectern
//!
//! These types describe what a recording session captures and at which
//! quality, independent of the media environment doing the capturing.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for unique session IDs
static SESSION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Create a new unique session id
    pub fn new() -> Self {
        Self(SESSION_COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw id value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Session({})", self.0)
    }
}

/// What a session captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Webcam video, optionally with microphone audio
    Camera,
    /// Display/window share, optionally with system audio
    Screen,
    /// Microphone only
    Audio,
}

impl CaptureMode {
    /// All modes, in the order the UI offers them
    pub const ALL: [CaptureMode; 3] = [Self::Camera, Self::Screen, Self::Audio];

    /// Lowercase name used in filenames and query strings
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Screen => "screen",
            Self::Audio => "audio",
        }
    }

    /// Whether this mode produces a video track
    pub fn has_video(&self) -> bool {
        !matches!(self, Self::Audio)
    }

    /// Name of the device the user must grant access to
    pub fn device_noun(&self) -> &'static str {
        match self {
            Self::Camera => "camera and microphone",
            Self::Screen => "screen",
            Self::Audio => "microphone",
        }
    }
}

impl std::fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CaptureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "camera" | "webcam" | "video" => Ok(Self::Camera),
            "screen" | "display" => Ok(Self::Screen),
            "audio" | "mic" | "microphone" => Ok(Self::Audio),
            _ => Err(format!("Unknown capture mode: {}", s)),
        }
    }
}

/// Requested capture quality (video modes only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// 640x480
    Sd,
    /// 1280x720 (default)
    #[default]
    Hd,
    /// 1920x1080
    #[serde(rename = "fullhd")]
    FullHd,
}

impl Quality {
    /// Get width in pixels
    pub fn width(&self) -> u32 {
        match self {
            Self::Sd => 640,
            Self::Hd => 1280,
            Self::FullHd => 1920,
        }
    }

    /// Get height in pixels
    pub fn height(&self) -> u32 {
        match self {
            Self::Sd => 480,
            Self::Hd => 720,
            Self::FullHd => 1080,
        }
    }

    /// Get (width, height)
    pub fn resolution(&self) -> (u32, u32) {
        (self.width(), self.height())
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sd => write!(f, "SD (640x480)"),
            Self::Hd => write!(f, "HD (1280x720)"),
            Self::FullHd => write!(f, "Full HD (1920x1080)"),
        }
    }
}

impl std::str::FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sd" | "480p" => Ok(Self::Sd),
            "hd" | "720p" => Ok(Self::Hd),
            "fullhd" | "full-hd" | "fhd" | "1080p" => Ok(Self::FullHd),
            _ => Err(format!("Unknown quality: {}", s)),
        }
    }
}

/// Kind of a live media track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_unique() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("Camera".parse::<CaptureMode>(), Ok(CaptureMode::Camera));
        assert_eq!("display".parse::<CaptureMode>(), Ok(CaptureMode::Screen));
        assert_eq!("mic".parse::<CaptureMode>(), Ok(CaptureMode::Audio));
        assert!("hologram".parse::<CaptureMode>().is_err());
    }

    #[test]
    fn test_quality_resolution() {
        assert_eq!(Quality::Sd.resolution(), (640, 480));
        assert_eq!(Quality::default().resolution(), (1280, 720));
        assert_eq!("1080p".parse::<Quality>(), Ok(Quality::FullHd));
    }

    #[test]
    fn test_mode_serde_lowercase() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            mode: CaptureMode,
            quality: Quality,
        }
        let text = toml::to_string(&Wrapper {
            mode: CaptureMode::Screen,
            quality: Quality::FullHd,
        })
        .unwrap();
        assert!(text.contains("mode = \"screen\""));
        assert!(text.contains("quality = \"fullhd\""));

        let parsed: Wrapper = toml::from_str(&text).unwrap();
        assert_eq!(parsed.mode, CaptureMode::Screen);
    }
}
