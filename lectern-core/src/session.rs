//! Recording session state machine
//!
//! One tagged-union state per session. Every variant that holds live
//! resources owns them, so leaving the variant (stop, reset, failure, drop)
//! is what releases them.
//!
//! ```text
//! Idle ─▶ Acquiring ─▶ Recording ⇄ Paused ─▶ Stopped ─▶ Finalized
//!   ▲          │            │          │         │
//!   │          └────────────┴──────────┴─────────┴──▶ Failed
//!   └──────────────────────── reset ─────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};

use crate::capture::{acquire, probe, AcquireRequest, MediaEnvironment};
use crate::config::RecorderConfig;
use crate::encode::EncoderEvent;
use crate::error::{ErrorKind, LecternError, Result};
use crate::finalize::{finalize, Artifact};
use crate::recorder::Recorder;
use crate::timer::Timer;
use crate::types::{CaptureMode, Quality, SessionId};

/// Observable session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Acquiring,
    Recording,
    Paused,
    Stopped,
    Finalized,
    Failed,
}

impl SessionState {
    /// Finalized and Failed only leave via reset
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized | Self::Failed)
    }

    /// A capture source is held in these states
    pub fn holds_source(&self) -> bool {
        matches!(self, Self::Recording | Self::Paused)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Acquiring => "acquiring",
            Self::Recording => "recording",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Finalized => "finalized",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The one action a failed session offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Reset and try the same mode again
    Retry,
    /// Capture is impossible here; upload a file instead
    ManualUpload,
    /// Discard and start over
    Reset,
}

/// Why a session failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: ErrorKind,
    /// User-facing, mode-aware message
    pub message: String,
    pub action: RecoveryAction,
}

impl Failure {
    pub fn from_error(err: &LecternError, mode: CaptureMode) -> Self {
        let kind = err.kind();
        let action = match kind {
            ErrorKind::UnsupportedEnvironment => RecoveryAction::ManualUpload,
            ErrorKind::PermissionDenied
            | ErrorKind::DeviceNotFound
            | ErrorKind::AcquisitionFailed => RecoveryAction::Retry,
            _ => RecoveryAction::Reset,
        };
        Self {
            kind,
            message: err.user_message(mode),
            action,
        }
    }
}

/// Events broadcast to session subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    /// Audio was requested but the acquired source has none
    AudioUnavailable,
    Tick(u64),
    ChunkBuffered {
        bytes: usize,
        total_bytes: usize,
    },
    Failed(Failure),
    Finalized {
        bytes: usize,
        content_type: String,
    },
}

enum Phase {
    Idle,
    Acquiring,
    Recording(Recorder),
    Paused(Recorder),
    Stopped(Recorder),
    Finalized(Artifact),
    Failed(Failure),
}

impl Phase {
    fn state(&self) -> SessionState {
        match self {
            Phase::Idle => SessionState::Idle,
            Phase::Acquiring => SessionState::Acquiring,
            Phase::Recording(_) => SessionState::Recording,
            Phase::Paused(_) => SessionState::Paused,
            Phase::Stopped(_) => SessionState::Stopped,
            Phase::Finalized(_) => SessionState::Finalized,
            Phase::Failed(_) => SessionState::Failed,
        }
    }

    fn recorder(&self) -> Option<&Recorder> {
        match self {
            Phase::Recording(r) | Phase::Paused(r) | Phase::Stopped(r) => Some(r),
            _ => None,
        }
    }

    fn recorder_mut(&mut self) -> Option<&mut Recorder> {
        match self {
            Phase::Recording(r) | Phase::Paused(r) | Phase::Stopped(r) => Some(r),
            _ => None,
        }
    }
}

/// One capture attempt
pub struct RecordingSession {
    id: SessionId,
    mode: CaptureMode,
    quality: Quality,
    audio_requested: bool,
    audio_enabled: bool,
    screen_fps: u32,
    timeslice: Duration,
    phase: Phase,
    timer: Timer,
    events: broadcast::Sender<SessionEvent>,
}

impl RecordingSession {
    /// Create an idle session with default settings
    pub fn new(mode: CaptureMode) -> Self {
        Self::with_config(mode, &RecorderConfig::default())
    }

    /// Create an idle session from configuration
    pub fn with_config(mode: CaptureMode, config: &RecorderConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        let id = SessionId::new();
        debug!("{} created for {} ({})", id, mode, config.quality);
        Self {
            id,
            mode,
            quality: config.quality,
            audio_requested: config.audio_enabled,
            audio_enabled: config.audio_enabled,
            screen_fps: config.screen_fps,
            timeslice: config.flush_interval,
            phase: Phase::Idle,
            timer: Timer::new(),
            events,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn state(&self) -> SessionState {
        self.phase.state()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.timer.elapsed()
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer.is_running()
    }

    /// Effective audio setting; after acquisition this reflects what was granted
    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    /// Present only when finalized
    pub fn artifact(&self) -> Option<&Artifact> {
        match &self.phase {
            Phase::Finalized(artifact) => Some(artifact),
            _ => None,
        }
    }

    /// Present only when failed
    pub fn failure(&self) -> Option<&Failure> {
        match &self.phase {
            Phase::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Live tracks currently held by this session
    pub fn live_tracks(&self) -> usize {
        self.phase
            .recorder()
            .map(|r| r.source().live_tracks())
            .unwrap_or(0)
    }

    /// Bytes buffered so far in this attempt
    pub fn buffered_bytes(&self) -> usize {
        self.phase.recorder().map(Recorder::buffered_bytes).unwrap_or(0)
    }

    /// Negotiated content type, once recording
    pub fn content_type(&self) -> Option<&str> {
        match &self.phase {
            Phase::Finalized(artifact) => Some(artifact.content_type()),
            phase => phase.recorder().map(Recorder::mime_type),
        }
    }

    /// Subscribe to session events; drop the receiver to unsubscribe
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Change the quality preference (idle only)
    pub fn set_quality(&mut self, quality: Quality) -> Result<()> {
        self.require_idle("change quality")?;
        self.quality = quality;
        Ok(())
    }

    /// Change the audio preference (idle only)
    pub fn set_audio_enabled(&mut self, enabled: bool) -> Result<()> {
        self.require_idle("change audio")?;
        self.audio_requested = enabled;
        self.audio_enabled = enabled;
        Ok(())
    }

    /// Probe, acquire a source and start recording.
    ///
    /// Rejected unless idle. Probe and acquisition failures move the session
    /// to Failed and are also returned.
    pub async fn start(&mut self, env: &mut dyn MediaEnvironment) -> Result<()> {
        self.require_idle("start")?;
        if self.timeslice.is_zero() {
            return Err(LecternError::config("flush interval must be non-zero"));
        }

        let caps = env.capabilities();
        if let Some(reason) = probe::unsupported_reason(self.mode, &caps) {
            warn!("{}: {} capture unsupported: {}", self.id, self.mode, reason);
            return Err(self.fail(LecternError::UnsupportedEnvironment(self.mode)));
        }

        self.enter(SessionState::Idle, Phase::Acquiring);
        let request = AcquireRequest::new(self.mode)
            .with_quality(self.quality)
            .with_audio(self.audio_requested)
            .with_screen_fps(self.screen_fps);

        let acquired = match acquire(env, &request).await {
            Ok(acquired) => acquired,
            Err(e) => return Err(self.fail(e)),
        };

        self.audio_enabled = acquired.audio_enabled;
        if self.audio_requested && !acquired.audio_enabled {
            let _ = self.events.send(SessionEvent::AudioUnavailable);
        }

        let recorder = match Recorder::start(env, acquired.source, self.timeslice) {
            Ok(recorder) => recorder,
            Err(e) => {
                let e = match e {
                    LecternError::Encoding(_) => e,
                    other => LecternError::encoding(other.to_string()),
                };
                return Err(self.fail(e));
            }
        };

        self.timer.start();
        self.enter(SessionState::Acquiring, Phase::Recording(recorder));
        info!("{}: recording {}", self.id, self.mode);
        Ok(())
    }

    /// Recording → Paused
    pub fn pause(&mut self) -> Result<()> {
        let from = self.state();
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Recording(mut recorder) => {
                self.timer.stop();
                if let Err(e) = recorder.pause() {
                    self.phase = Phase::Recording(recorder);
                    return Err(self.fail(e));
                }
                self.enter(from, Phase::Paused(recorder));
                Ok(())
            }
            other => {
                self.phase = other;
                Err(LecternError::InvalidTransition {
                    action: "pause",
                    state: from,
                })
            }
        }
    }

    /// Paused → Recording
    pub fn resume(&mut self) -> Result<()> {
        let from = self.state();
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Paused(mut recorder) => {
                if let Err(e) = recorder.resume() {
                    self.phase = Phase::Paused(recorder);
                    return Err(self.fail(e));
                }
                self.timer.start();
                self.enter(from, Phase::Recording(recorder));
                Ok(())
            }
            other => {
                self.phase = other;
                Err(LecternError::InvalidTransition {
                    action: "resume",
                    state: from,
                })
            }
        }
    }

    /// Recording/Paused → Stopped. Releases the source.
    ///
    /// A no-op once stopped, finalized or failed.
    pub fn stop(&mut self) -> Result<()> {
        let from = self.state();
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Recording(mut recorder) | Phase::Paused(mut recorder) => {
                self.timer.stop();
                if let Err(e) = recorder.stop() {
                    self.phase = Phase::Stopped(recorder);
                    return Err(self.fail(e));
                }
                info!(
                    "{}: stopped after {}s, {} bytes buffered",
                    self.id,
                    self.timer.elapsed(),
                    recorder.buffered_bytes()
                );
                self.enter(from, Phase::Stopped(recorder));
                Ok(())
            }
            other @ (Phase::Stopped(_) | Phase::Finalized(_) | Phase::Failed(_)) => {
                trace!("{}: stop ignored while {}", self.id, from);
                self.phase = other;
                Ok(())
            }
            other => {
                self.phase = other;
                Err(LecternError::InvalidTransition {
                    action: "stop",
                    state: from,
                })
            }
        }
    }

    /// Any state → Idle. Releases the source and zeroes the timer.
    pub fn reset(&mut self) {
        let from = self.state();
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Recording(recorder) | Phase::Paused(recorder) | Phase::Stopped(recorder) => {
                recorder.discard();
            }
            _ => {}
        }
        self.timer.reset();
        self.audio_enabled = self.audio_requested;
        if from != SessionState::Idle {
            info!("{}: reset from {}", self.id, from);
            let _ = self.events.send(SessionEvent::StateChanged {
                from,
                to: SessionState::Idle,
            });
        }
    }

    /// Deliver one timer interval. Counts only while recording.
    pub fn tick(&mut self) -> Option<u64> {
        if !matches!(self.phase, Phase::Recording(_)) {
            return None;
        }
        let elapsed = self.timer.tick()?;
        let _ = self.events.send(SessionEvent::Tick(elapsed));
        Some(elapsed)
    }

    /// Wait for the next encoder event, if a recorder is active
    pub async fn next_encoder_event(&mut self) -> Option<EncoderEvent> {
        let recorder = self.phase.recorder_mut()?;
        if recorder.is_stop_complete() {
            return None;
        }
        match recorder.next_event().await {
            Some(event) => Some(event),
            None => Some(EncoderEvent::Error("encoder closed unexpectedly".to_string())),
        }
    }

    /// Whether encoder events are still expected
    pub fn awaiting_encoder(&self) -> bool {
        self.phase
            .recorder()
            .map(|r| !r.is_stop_complete())
            .unwrap_or(false)
    }

    /// Apply one encoder event
    pub fn handle_encoder_event(&mut self, event: EncoderEvent) {
        let state = self.state();
        match event {
            EncoderEvent::Data(data) => {
                let Some(recorder) = self.phase.recorder_mut() else {
                    trace!("{}: chunk dropped while {}", self.id, state);
                    return;
                };
                let bytes = recorder.append_chunk(data);
                if bytes > 0 {
                    let total_bytes = recorder.buffered_bytes();
                    let _ = self
                        .events
                        .send(SessionEvent::ChunkBuffered { bytes, total_bytes });
                }
            }
            EncoderEvent::Error(message) => {
                if self.phase.recorder().is_some() {
                    self.fail(LecternError::encoding(message));
                }
            }
            EncoderEvent::SourceEnded => {
                if state.holds_source() {
                    info!("{}: capture source ended, stopping", self.id);
                    let _ = self.stop();
                }
            }
            EncoderEvent::Stopped => {
                if state.holds_source() {
                    warn!("{}: encoder stopped on its own", self.id);
                    if self.stop().is_err() {
                        return;
                    }
                }
                self.complete();
            }
        }
    }

    /// Apply every encoder event already queued, without waiting
    pub fn process_pending(&mut self) {
        while let Some(event) = self.phase.recorder_mut().and_then(Recorder::try_next_event) {
            self.handle_encoder_event(event);
        }
    }

    /// Stop if needed and wait for the artifact
    pub async fn finish(&mut self) -> Result<&Artifact> {
        if self.state().holds_source() {
            self.stop()?;
        }
        while self.state() == SessionState::Stopped {
            match self.next_encoder_event().await {
                Some(event) => self.handle_encoder_event(event),
                None => break,
            }
        }
        match &self.phase {
            Phase::Finalized(artifact) => Ok(artifact),
            _ => Err(LecternError::NoArtifact),
        }
    }

    /// Stopped → Finalized
    fn complete(&mut self) {
        let from = self.state();
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Stopped(mut recorder) => {
                recorder.mark_stop_complete();
                let (chunks, content_type) = recorder.into_output();
                let artifact = finalize(&chunks, &content_type, self.mode);
                info!(
                    "{}: finalized {} chunk(s), {} bytes of {}",
                    self.id,
                    chunks.len(),
                    artifact.len(),
                    content_type
                );
                let _ = self.events.send(SessionEvent::Finalized {
                    bytes: artifact.len(),
                    content_type,
                });
                self.enter(from, Phase::Finalized(artifact));
            }
            other => {
                trace!("{}: encoder stop ignored while {}", self.id, from);
                self.phase = other;
            }
        }
    }

    /// Move to Failed, discarding any buffered data. Returns the error.
    fn fail(&mut self, err: LecternError) -> LecternError {
        let from = self.state();
        if let Phase::Recording(recorder) | Phase::Paused(recorder) | Phase::Stopped(recorder) =
            std::mem::replace(&mut self.phase, Phase::Idle)
        {
            recorder.discard();
        }
        self.timer.stop();

        let failure = Failure::from_error(&err, self.mode);
        error!("{}: {} failed: {}", self.id, self.mode, err);
        let _ = self.events.send(SessionEvent::Failed(failure.clone()));
        self.enter(from, Phase::Failed(failure));
        err
    }

    fn require_idle(&self, action: &'static str) -> Result<()> {
        match self.state() {
            SessionState::Idle => Ok(()),
            state => Err(LecternError::InvalidTransition { action, state }),
        }
    }

    fn enter(&mut self, from: SessionState, phase: Phase) {
        self.phase = phase;
        let to = self.phase.state();
        if from != to {
            debug!("{}: {} -> {}", self.id, from, to);
            let _ = self.events.send(SessionEvent::StateChanged { from, to });
        }
    }
}

impl std::fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSession")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("state", &self.state())
            .field("elapsed_seconds", &self.timer.elapsed())
            .field("audio_enabled", &self.audio_enabled)
            .finish()
    }
}
