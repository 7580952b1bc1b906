//! Media capture against a pluggable environment
//!
//! This module handles:
//! - Capability probing before any device is touched
//! - Stream acquisition for camera, screen and microphone capture
//! - Exclusive ownership and release of the live tracks
//!
//! The platform itself sits behind [`MediaEnvironment`]. A browser binding,
//! a native backend or the synthetic environment in [`crate::sim`] all plug in
//! here.

pub mod acquire;
pub mod probe;
pub mod source;

pub use acquire::{acquire, AcquireRequest, Acquired};
pub use probe::{is_supported, unsupported_reason};
pub use source::CaptureSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::encode::{EncoderEvent, MediaEncoder};
use crate::error::Result;
use crate::types::TrackKind;

/// What the runtime environment offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Running in a secure context (device APIs are gated on this)
    pub secure_context: bool,
    /// Camera/microphone acquisition is available
    pub user_media: bool,
    /// Display/window acquisition is available
    pub display_media: bool,
    /// An encoder facility exists
    pub encoder: bool,
}

impl Capabilities {
    /// Everything available
    pub fn full() -> Self {
        Self {
            secure_context: true,
            user_media: true,
            display_media: true,
            encoder: true,
        }
    }

    /// Nothing available
    pub fn none() -> Self {
        Self {
            secure_context: false,
            user_media: false,
            display_media: false,
            encoder: false,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::full()
    }
}

/// Video track constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoConstraints {
    /// Ideal width in pixels (None = environment default)
    pub width: Option<u32>,
    /// Ideal height in pixels
    pub height: Option<u32>,
    /// Ideal frame rate
    pub frame_rate: Option<u32>,
}

/// Audio track constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl AudioConstraints {
    /// Voice-oriented processing for microphone-only capture
    pub fn voice() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// A stream request; `None` means the track kind is not requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MediaConstraints {
    pub video: Option<VideoConstraints>,
    pub audio: Option<AudioConstraints>,
}

/// Why the environment refused a stream request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireErrorKind {
    /// User or OS declined access
    NotAllowed,
    /// No matching device
    NotFound,
    /// Anything else (constraints, hardware busy, aborted)
    Other,
}

/// Error reported by the environment for a stream request
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AcquireError {
    pub kind: AcquireErrorKind,
    pub message: String,
}

impl AcquireError {
    pub fn new(kind: AcquireErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_allowed(message: impl Into<String>) -> Self {
        Self::new(AcquireErrorKind::NotAllowed, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(AcquireErrorKind::NotFound, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(AcquireErrorKind::Other, message)
    }
}

/// One live track of a media stream
pub trait MediaTrack: Send + std::fmt::Debug {
    /// Audio or video
    fn kind(&self) -> TrackKind;

    /// Device label
    fn label(&self) -> &str;

    /// Whether the track is still producing media
    fn is_live(&self) -> bool;

    /// Stop the track and release the underlying device. Must be idempotent.
    fn stop(&mut self);
}

/// Tracks returned by a successful stream request
#[derive(Debug, Default)]
pub struct MediaStream {
    pub tracks: Vec<Box<dyn MediaTrack>>,
}

impl MediaStream {
    pub fn new(tracks: Vec<Box<dyn MediaTrack>>) -> Self {
        Self { tracks }
    }
}

/// The platform a session records on
#[async_trait]
pub trait MediaEnvironment: Send {
    /// Report what this environment can do; must not touch devices
    fn capabilities(&self) -> Capabilities;

    /// Whether the encoder accepts this MIME type
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Request camera and/or microphone tracks
    async fn get_user_media(
        &mut self,
        constraints: &MediaConstraints,
    ) -> std::result::Result<MediaStream, AcquireError>;

    /// Request a display/window share
    async fn get_display_media(
        &mut self,
        constraints: &MediaConstraints,
    ) -> std::result::Result<MediaStream, AcquireError>;

    /// Create an encoder over a live source.
    ///
    /// `mime_type` is `None` when no preferred type is supported; the
    /// encoder then uses its default container. Chunks, errors and the
    /// final stop notification are delivered on `events`.
    fn create_encoder(
        &mut self,
        source: &CaptureSource,
        mime_type: Option<&str>,
        events: mpsc::UnboundedSender<EncoderEvent>,
    ) -> Result<Box<dyn MediaEncoder>>;
}
