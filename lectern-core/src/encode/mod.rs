//! Encoder negotiation and the encoder seam
//!
//! This module provides:
//! - Ordered container/codec preferences per capture mode
//! - Negotiation against what the environment supports
//! - The [`MediaEncoder`] trait and the events an encoder emits

use bytes::Bytes;
use std::time::Duration;
use tracing::debug;

use crate::error::Result;
use crate::types::CaptureMode;

/// Video preferences, most efficient first
pub const VIDEO_MIME_PREFERENCES: &[&str] = &[
    "video/webm;codecs=vp9,opus",
    "video/webm;codecs=vp8,opus",
    "video/webm",
    "video/mp4",
];

/// Audio preferences, most efficient first
pub const AUDIO_MIME_PREFERENCES: &[&str] = &[
    "audio/webm;codecs=opus",
    "audio/ogg;codecs=opus",
    "audio/webm",
    "audio/mp4",
];

/// Default chunk flush interval
pub const DEFAULT_TIMESLICE: Duration = Duration::from_secs(1);

/// Preference list for a mode
pub fn mime_preferences(mode: CaptureMode) -> &'static [&'static str] {
    if mode.has_video() {
        VIDEO_MIME_PREFERENCES
    } else {
        AUDIO_MIME_PREFERENCES
    }
}

/// Pick the first preferred MIME type the environment supports.
///
/// `None` means the encoder should fall back to its default container.
pub fn negotiate_mime_type(
    mode: CaptureMode,
    is_supported: impl Fn(&str) -> bool,
) -> Option<&'static str> {
    let chosen = mime_preferences(mode)
        .iter()
        .copied()
        .find(|mime| is_supported(mime));
    debug!("Negotiated {:?} for {}", chosen, mode);
    chosen
}

/// Container an encoder uses when no type was negotiated
pub fn default_container(mode: CaptureMode) -> &'static str {
    if mode.has_video() {
        "video/webm"
    } else {
        "audio/webm"
    }
}

/// Download file extension for a mode
pub fn file_extension(mode: CaptureMode) -> &'static str {
    match mode {
        CaptureMode::Camera | CaptureMode::Screen => "webm",
        CaptureMode::Audio => "weba",
    }
}

/// Whether a MIME type denotes audio-only content
pub fn is_audio_type(mime_type: &str) -> bool {
    mime_type.trim().to_ascii_lowercase().starts_with("audio/")
}

/// Event delivered by an encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderEvent {
    /// A flushed chunk of encoded data (may be empty)
    Data(Bytes),
    /// The encoder failed; no further data follows
    Error(String),
    /// The underlying source ended outside the session's control
    SourceEnded,
    /// The encoder flushed everything after `stop()`; always last
    Stopped,
}

/// A running encoder over a capture source
pub trait MediaEncoder: Send {
    /// MIME type of the produced data
    fn mime_type(&self) -> &str;

    /// Begin encoding, flushing a chunk every `timeslice`
    fn start(&mut self, timeslice: Duration) -> Result<()>;

    /// Suspend encoding
    fn pause(&mut self) -> Result<()>;

    /// Resume after pause
    fn resume(&mut self) -> Result<()>;

    /// Flush remaining data, then emit [`EncoderEvent::Stopped`]. Idempotent.
    fn stop(&mut self) -> Result<()>;
}
