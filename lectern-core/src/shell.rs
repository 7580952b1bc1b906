//! Session shell
//!
//! Composition root for one recording view. Owns the media environment and
//! the session, exposes a view model, and runs the loop that serializes user
//! commands, timer ticks and encoder events.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::capture::{probe, MediaEnvironment};
use crate::config::RecorderConfig;
use crate::error::{LecternError, Result};
use crate::finalize::Artifact;
use crate::session::{Failure, RecordingSession, RecoveryAction, SessionState};
use crate::types::{CaptureMode, Quality};

/// What the caller passes when opening the recording view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellParams {
    pub mode: CaptureMode,
    /// Content title, used for the download name
    pub title: String,
    pub unit_id: String,
    pub course_id: String,
}

impl ShellParams {
    pub fn new(
        mode: CaptureMode,
        title: impl Into<String>,
        unit_id: impl Into<String>,
        course_id: impl Into<String>,
    ) -> Self {
        Self {
            mode,
            title: title.into(),
            unit_id: unit_id.into(),
            course_id: course_id.into(),
        }
    }
}

/// Where the caller navigates back to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnTarget {
    pub course_id: String,
    pub unit_id: String,
    /// A recording was saved; the caller shows a success indicator
    pub saved: bool,
}

impl std::fmt::Display for ReturnTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/courses/{}/units/{}", self.course_id, self.unit_id)?;
        if self.saved {
            write!(f, "?saved=true")?;
        }
        Ok(())
    }
}

/// How the shell was left
#[derive(Debug, Clone)]
pub struct ShellExit {
    pub target: ReturnTarget,
    /// Handed to the upload collaborator when saved
    pub artifact: Option<Artifact>,
    pub filename: Option<String>,
}

/// User actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Start,
    Pause,
    Resume,
    Stop,
    Reset,
    /// Reset, then start again
    Retry,
    /// Write the artifact to this directory (None = configured directory)
    Download(Option<PathBuf>),
    SaveAndReturn,
    /// Leave without saving
    Cancel,
}

/// What the recording view shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ShellView {
    /// Capture is impossible here; offer a file upload instead
    ManualUpload { reason: String },
    Ready {
        mode: CaptureMode,
        quality: Quality,
        audio_enabled: bool,
    },
    Acquiring,
    Recording { elapsed_seconds: u64, paused: bool },
    Finalizing,
    Review {
        filename: String,
        size_bytes: usize,
        content_type: String,
    },
    Failed(Failure),
}

impl ShellView {
    /// Whether the command's control is enabled in this view
    pub fn allows(&self, command: &ShellCommand) -> bool {
        use ShellCommand as C;
        if matches!(command, C::Cancel) {
            return true;
        }
        match self {
            ShellView::ManualUpload { .. } | ShellView::Acquiring | ShellView::Finalizing => false,
            ShellView::Ready { .. } => matches!(command, C::Start),
            ShellView::Recording { paused: false, .. } => {
                matches!(command, C::Pause | C::Stop | C::Reset)
            }
            ShellView::Recording { paused: true, .. } => {
                matches!(command, C::Resume | C::Stop | C::Reset)
            }
            ShellView::Review { .. } => {
                matches!(command, C::Download(_) | C::SaveAndReturn | C::Reset)
            }
            ShellView::Failed(_) => matches!(command, C::Retry | C::Reset),
        }
    }
}

/// One recording view over a media environment
pub struct SessionShell<E: MediaEnvironment> {
    params: ShellParams,
    config: RecorderConfig,
    env: E,
    session: RecordingSession,
    downloads: Vec<PathBuf>,
    failed: Vec<(ShellCommand, LecternError)>,
}

impl<E: MediaEnvironment> SessionShell<E> {
    /// Open the view. Rejects configs with unusable intervals.
    pub fn new(params: ShellParams, config: RecorderConfig, env: E) -> Result<Self> {
        config.validate_strict()?;
        let session = RecordingSession::with_config(params.mode, &config);
        info!(
            "Recording view opened: {} '{}' (course {}, unit {})",
            params.mode, params.title, params.course_id, params.unit_id
        );
        Ok(Self {
            params,
            config,
            env,
            session,
            downloads: Vec::new(),
            failed: Vec::new(),
        })
    }

    pub fn params(&self) -> &ShellParams {
        &self.params
    }

    pub fn session(&self) -> &RecordingSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut RecordingSession {
        &mut self.session
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    /// Files written by downloads, in order
    pub fn downloads(&self) -> &[PathBuf] {
        &self.downloads
    }

    /// Commands the run loop applied that returned an error, in order
    pub fn failed_commands(&self) -> &[(ShellCommand, LecternError)] {
        &self.failed
    }

    /// Probe the environment for the session's mode
    pub fn is_supported(&self) -> bool {
        probe::is_supported(self.params.mode, &self.env.capabilities())
    }

    /// Current view model
    pub fn view(&self) -> ShellView {
        match self.session.state() {
            SessionState::Idle => {
                let caps = self.env.capabilities();
                match probe::unsupported_reason(self.params.mode, &caps) {
                    Some(reason) => ShellView::ManualUpload {
                        reason: reason.to_string(),
                    },
                    None => ShellView::Ready {
                        mode: self.params.mode,
                        quality: self.session.quality(),
                        audio_enabled: self.session.audio_enabled(),
                    },
                }
            }
            SessionState::Acquiring => ShellView::Acquiring,
            SessionState::Recording | SessionState::Paused => ShellView::Recording {
                elapsed_seconds: self.session.elapsed_seconds(),
                paused: self.session.state() == SessionState::Paused,
            },
            SessionState::Stopped => ShellView::Finalizing,
            SessionState::Finalized => match self.session.artifact() {
                Some(artifact) => ShellView::Review {
                    filename: artifact.suggested_filename(&self.params.title),
                    size_bytes: artifact.len(),
                    content_type: artifact.content_type().to_string(),
                },
                None => ShellView::Finalizing,
            },
            SessionState::Failed => match self.session.failure() {
                Some(failure) if failure.action == RecoveryAction::ManualUpload => {
                    ShellView::ManualUpload {
                        reason: failure.message.clone(),
                    }
                }
                Some(failure) => ShellView::Failed(failure.clone()),
                None => ShellView::Finalizing,
            },
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        self.session.start(&mut self.env).await
    }

    pub fn pause(&mut self) -> Result<()> {
        self.session.pause()
    }

    pub fn resume(&mut self) -> Result<()> {
        self.session.resume()
    }

    pub fn stop(&mut self) -> Result<()> {
        self.session.stop()
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }

    pub async fn retry(&mut self) -> Result<()> {
        self.session.reset();
        self.session.start(&mut self.env).await
    }

    /// Download name for the finalized artifact
    pub fn suggested_filename(&self) -> Option<String> {
        self.session
            .artifact()
            .map(|a| a.suggested_filename(&self.params.title))
    }

    /// Write the finalized artifact to `dir`, or the configured directory
    pub fn download(&mut self, dir: Option<&Path>) -> Result<PathBuf> {
        let artifact = self.session.artifact().ok_or(LecternError::NoArtifact)?;
        let filename = artifact.suggested_filename(&self.params.title);
        let dir = dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.download_dir());
        let path = artifact.write_to_dir(&dir, &filename)?;
        self.downloads.push(path.clone());
        Ok(path)
    }

    /// Hand the artifact to the caller and navigate back with `saved`
    pub fn save_and_return(&mut self) -> Result<ShellExit> {
        let artifact = self
            .session
            .artifact()
            .cloned()
            .ok_or(LecternError::NoArtifact)?;
        let filename = artifact.suggested_filename(&self.params.title);
        info!("Saving {} ({} bytes), returning to caller", filename, artifact.len());
        self.session.reset();
        Ok(ShellExit {
            target: self.return_target(true),
            artifact: Some(artifact),
            filename: Some(filename),
        })
    }

    /// Leave without saving; releases anything still held
    pub fn cancel(&mut self) -> ShellExit {
        self.session.reset();
        ShellExit {
            target: self.return_target(false),
            artifact: None,
            filename: None,
        }
    }

    pub fn return_target(&self, saved: bool) -> ReturnTarget {
        ReturnTarget {
            course_id: self.params.course_id.clone(),
            unit_id: self.params.unit_id.clone(),
            saved,
        }
    }

    /// Drive the view until the user leaves it.
    ///
    /// Commands, ticks and encoder events are handled one at a time.
    /// Commands whose control is disabled in the current view are ignored.
    /// Closing the command channel is treated as leaving without saving.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<ShellCommand>) -> Result<ShellExit> {
        let period = self.config.tick_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        debug!("Command channel closed");
                        return Ok(self.cancel());
                    };
                    let was_recording = self.session.state() == SessionState::Recording;
                    if let Some(exit) = self.apply(command).await {
                        return Ok(exit);
                    }
                    if !was_recording && self.session.state() == SessionState::Recording {
                        // A full interval must pass before the first count
                        ticker.reset();
                    }
                }
                _ = ticker.tick() => {
                    self.session.tick();
                }
                Some(event) = self.session.next_encoder_event(), if self.session.awaiting_encoder() => {
                    self.session.handle_encoder_event(event);
                }
            }
        }
    }

    async fn apply(&mut self, command: ShellCommand) -> Option<ShellExit> {
        let view = self.view();
        if !view.allows(&command) {
            warn!("{:?} is not available in the current view", command);
            return None;
        }

        let result = match &command {
            ShellCommand::Start => self.start().await,
            ShellCommand::Pause => self.pause(),
            ShellCommand::Resume => self.resume(),
            ShellCommand::Stop => self.stop(),
            ShellCommand::Reset => {
                self.reset();
                Ok(())
            }
            ShellCommand::Retry => self.retry().await,
            ShellCommand::Download(dir) => self.download(dir.as_deref()).map(|path| {
                info!("Downloaded to {}", path.display());
            }),
            ShellCommand::SaveAndReturn => match self.save_and_return() {
                Ok(exit) => return Some(exit),
                Err(e) => Err(e),
            },
            ShellCommand::Cancel => return Some(self.cancel()),
        };

        if let Err(e) = result {
            warn!("{:?} failed: {}", command, e);
            self.failed.push((command, e));
        }
        None
    }
}
