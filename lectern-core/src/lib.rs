//! Lectern Core Library
//!
//! Camera, screen and microphone recording sessions for course authoring.
//!
//! This library provides:
//! - Capability probing and stream acquisition against a pluggable media environment
//! - A recorder that buffers encoded chunks with pause/resume support
//! - A session state machine that owns every live resource it acquires
//! - A session shell that serializes user commands, ticks and encoder events
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ Probe        │───▶│ Acquire      │───▶│ Recorder     │───▶│ Finalize     │
//! │ (caps check) │    │ (env stream) │    │ (chunks)     │    │ (artifact)   │
//! └──────────────┘    └──────────────┘    └──────────────┘    └──────────────┘
//! ```

pub mod capture;
pub mod config;
pub mod encode;
pub mod error;
pub mod finalize;
pub mod recorder;
pub mod session;
pub mod shell;
pub mod sim;
pub mod timer;
pub mod types;

pub use config::{ConfigFile, RecorderConfig};
pub use error::{ErrorKind, LecternError, Result};
pub use finalize::Artifact;
pub use session::{RecordingSession, SessionEvent, SessionState};
pub use shell::{ReturnTarget, SessionShell, ShellCommand, ShellParams};
pub use types::{CaptureMode, Quality, SessionId};
