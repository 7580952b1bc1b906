//! Error types for Lectern

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::SessionState;
use crate::types::CaptureMode;

/// Result type alias using LecternError
pub type Result<T> = std::result::Result<T, LecternError>;

/// Main error type for Lectern operations
#[derive(Debug, Error)]
pub enum LecternError {
    /// The environment cannot capture this mode at all
    #[error("Recording {0} is not supported in this environment")]
    UnsupportedEnvironment(CaptureMode),

    /// The user or OS declined access to the device
    #[error("Permission denied for {mode}: {detail}")]
    PermissionDenied { mode: CaptureMode, detail: String },

    /// No matching device is present
    #[error("No device found for {mode}: {detail}")]
    DeviceNotFound { mode: CaptureMode, detail: String },

    /// Any other stream negotiation failure
    #[error("Acquisition failed: {0}")]
    AcquisitionFailed(String),

    /// Recorder/encoder fault after acquisition succeeded
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Action not valid in the current state
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: SessionState,
    },

    /// No finalized artifact is available
    #[error("No recording available")]
    NoArtifact,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<LecternError>,
    },
}

/// Coarse classification of a [`LecternError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedEnvironment,
    PermissionDenied,
    DeviceNotFound,
    AcquisitionFailed,
    PlaybackOrEncodingFault,
    InvalidTransition,
    NoArtifact,
    Config,
    Io,
}

impl LecternError {
    /// Create an acquisition error
    pub fn acquisition(msg: impl Into<String>) -> Self {
        Self::AcquisitionFailed(msg.into())
    }

    /// Create an encoding error
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Classify this error, looking through context wrappers
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedEnvironment(_) => ErrorKind::UnsupportedEnvironment,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::DeviceNotFound { .. } => ErrorKind::DeviceNotFound,
            Self::AcquisitionFailed(_) => ErrorKind::AcquisitionFailed,
            Self::Encoding(_) => ErrorKind::PlaybackOrEncodingFault,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::NoArtifact => ErrorKind::NoArtifact,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
            Self::WithContext { source, .. } => source.kind(),
        }
    }

    /// Message shown to the person recording
    pub fn user_message(&self, mode: CaptureMode) -> String {
        match self.kind() {
            ErrorKind::UnsupportedEnvironment => format!(
                "Recording {} is not supported here. You can upload a file instead.",
                mode
            ),
            ErrorKind::PermissionDenied => format!(
                "Access to your {} was denied. Allow access and try again.",
                mode.device_noun()
            ),
            ErrorKind::DeviceNotFound => format!(
                "No {} was found. Connect a device and try again.",
                mode.device_noun()
            ),
            ErrorKind::AcquisitionFailed => {
                format!("Could not start {} recording. Please try again.", mode)
            }
            ErrorKind::PlaybackOrEncodingFault => {
                "Recording failed and was discarded. Please record again.".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Get a troubleshooting hint, if one applies
    pub fn user_hint(&self) -> Option<&'static str> {
        match self.kind() {
            ErrorKind::UnsupportedEnvironment => {
                Some("Capture requires a secure context, device access APIs and an encoder")
            }
            ErrorKind::PermissionDenied => {
                Some("Check the site or system privacy settings for device access")
            }
            ErrorKind::DeviceNotFound => Some("Make sure the device is connected and not disabled"),
            ErrorKind::Config => Some("Check ~/.config/lectern/config.toml for invalid values"),
            _ => None,
        }
    }

    /// Whether a single user action (retry, reset, upload) can recover
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UnsupportedEnvironment
                | ErrorKind::PermissionDenied
                | ErrorKind::DeviceNotFound
                | ErrorKind::AcquisitionFailed
                | ErrorKind::PlaybackOrEncodingFault
                | ErrorKind::InvalidTransition
                | ErrorKind::Config
        )
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}
