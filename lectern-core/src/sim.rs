//! Synthetic media environment
//!
//! An in-process [`MediaEnvironment`] with scriptable refusals and a
//! generator that emits deterministic chunks. The CLI records against it,
//! and tests use its [`SimHandle`] to inspect acquisition calls and live
//! tracks or to inject encoder events.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::capture::{
    AcquireError, Capabilities, CaptureSource, MediaConstraints, MediaEnvironment, MediaStream,
    MediaTrack,
};
use crate::encode::{default_container, EncoderEvent, MediaEncoder};
use crate::error::{LecternError, Result};
use crate::types::TrackKind;

/// A track whose liveness is visible through the [`SimHandle`]
#[derive(Debug)]
pub struct SimTrack {
    kind: TrackKind,
    label: String,
    live: Arc<AtomicBool>,
}

impl MediaTrack for SimTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn stop(&mut self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimEncoderState {
    Inactive,
    Recording,
    Paused,
    Stopped,
}

struct EncoderCore {
    tx: mpsc::UnboundedSender<EncoderEvent>,
    state: SimEncoderState,
    sequence: u64,
}

impl EncoderCore {
    fn emit(&mut self, event: EncoderEvent) -> bool {
        if self.state == SimEncoderState::Stopped {
            return false;
        }
        self.tx.send(event).is_ok()
    }
}

#[derive(Default)]
struct Shared {
    user_media_calls: usize,
    display_media_calls: usize,
    requests: Vec<MediaConstraints>,
    tracks: Vec<Arc<AtomicBool>>,
    encoders: Vec<Arc<Mutex<EncoderCore>>>,
}

/// Inspection and event-injection handle for a [`SimulatedEnvironment`]
#[derive(Clone)]
pub struct SimHandle {
    shared: Arc<Mutex<Shared>>,
}

impl SimHandle {
    /// Calls into either acquisition API
    pub fn acquisition_calls(&self) -> usize {
        let shared = self.shared.lock();
        shared.user_media_calls + shared.display_media_calls
    }

    pub fn user_media_calls(&self) -> usize {
        self.shared.lock().user_media_calls
    }

    pub fn display_media_calls(&self) -> usize {
        self.shared.lock().display_media_calls
    }

    /// Constraints of every acquisition request, in order
    pub fn requests(&self) -> Vec<MediaConstraints> {
        self.shared.lock().requests.clone()
    }

    /// Tracks handed out that have not been stopped
    pub fn live_tracks(&self) -> usize {
        self.shared
            .lock()
            .tracks
            .iter()
            .filter(|live| live.load(Ordering::SeqCst))
            .count()
    }

    /// Encoders created so far
    pub fn encoders_created(&self) -> usize {
        self.shared.lock().encoders.len()
    }

    /// Deliver a chunk from the most recent encoder
    pub fn emit_chunk(&self, data: impl Into<Bytes>) -> bool {
        self.emit(EncoderEvent::Data(data.into()))
    }

    /// Report an encoder fault from the most recent encoder
    pub fn emit_error(&self, message: impl Into<String>) -> bool {
        self.emit(EncoderEvent::Error(message.into()))
    }

    /// End every track, as if the user stopped sharing from the platform UI
    pub fn end_source(&self) -> bool {
        {
            let shared = self.shared.lock();
            for live in &shared.tracks {
                live.store(false, Ordering::SeqCst);
            }
        }
        self.emit(EncoderEvent::SourceEnded)
    }

    fn emit(&self, event: EncoderEvent) -> bool {
        let encoder = self.shared.lock().encoders.last().cloned();
        match encoder {
            Some(core) => core.lock().emit(event),
            None => false,
        }
    }
}

/// Scriptable in-process media environment
pub struct SimulatedEnvironment {
    capabilities: Capabilities,
    supported_types: Option<Vec<String>>,
    user_media_failures: VecDeque<AcquireError>,
    display_media_failures: VecDeque<AcquireError>,
    display_audio: bool,
    generated_chunk_size: Option<usize>,
    encoder_failure: Option<String>,
    shared: Arc<Mutex<Shared>>,
}

impl Default for SimulatedEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedEnvironment {
    /// Everything supported, every request granted, no generated chunks
    pub fn new() -> Self {
        Self {
            capabilities: Capabilities::full(),
            supported_types: None,
            user_media_failures: VecDeque::new(),
            display_media_failures: VecDeque::new(),
            display_audio: true,
            generated_chunk_size: None,
            encoder_failure: None,
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    /// Handle for inspection and event injection
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Restrict encoder support to these MIME types (empty = none)
    pub fn with_supported_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Refuse the next camera/microphone request with `err`
    pub fn fail_user_media(mut self, err: AcquireError) -> Self {
        self.user_media_failures.push_back(err);
        self
    }

    /// Refuse the next display request with `err`; repeat to refuse more
    pub fn fail_display_media(mut self, err: AcquireError) -> Self {
        self.display_media_failures.push_back(err);
        self
    }

    /// Whether display shares include an audio track when asked
    pub fn with_display_audio(mut self, enabled: bool) -> Self {
        self.display_audio = enabled;
        self
    }

    /// Emit a `size`-byte chunk every flush interval while recording
    pub fn with_generated_chunks(mut self, size: usize) -> Self {
        self.generated_chunk_size = Some(size);
        self
    }

    /// Make encoder creation fail
    pub fn fail_encoder(mut self, message: impl Into<String>) -> Self {
        self.encoder_failure = Some(message.into());
        self
    }

    fn make_track(&self, kind: TrackKind, label: &str) -> Box<dyn MediaTrack> {
        let live = Arc::new(AtomicBool::new(true));
        self.shared.lock().tracks.push(Arc::clone(&live));
        Box::new(SimTrack {
            kind,
            label: label.to_string(),
            live,
        })
    }
}

#[async_trait]
impl MediaEnvironment for SimulatedEnvironment {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        match &self.supported_types {
            Some(types) => types.iter().any(|t| t == mime_type),
            None => true,
        }
    }

    async fn get_user_media(
        &mut self,
        constraints: &MediaConstraints,
    ) -> std::result::Result<MediaStream, AcquireError> {
        {
            let mut shared = self.shared.lock();
            shared.user_media_calls += 1;
            shared.requests.push(*constraints);
        }
        if let Some(err) = self.user_media_failures.pop_front() {
            debug!("Simulated user media refused: {}", err);
            return Err(err);
        }

        let mut tracks = Vec::new();
        if constraints.video.is_some() {
            tracks.push(self.make_track(TrackKind::Video, "Simulated Camera"));
        }
        if constraints.audio.is_some() {
            tracks.push(self.make_track(TrackKind::Audio, "Simulated Microphone"));
        }
        Ok(MediaStream::new(tracks))
    }

    async fn get_display_media(
        &mut self,
        constraints: &MediaConstraints,
    ) -> std::result::Result<MediaStream, AcquireError> {
        {
            let mut shared = self.shared.lock();
            shared.display_media_calls += 1;
            shared.requests.push(*constraints);
        }
        if let Some(err) = self.display_media_failures.pop_front() {
            debug!("Simulated display media refused: {}", err);
            return Err(err);
        }

        let mut tracks = vec![self.make_track(TrackKind::Video, "Simulated Display")];
        if constraints.audio.is_some() && self.display_audio {
            tracks.push(self.make_track(TrackKind::Audio, "Simulated System Audio"));
        }
        Ok(MediaStream::new(tracks))
    }

    fn create_encoder(
        &mut self,
        source: &CaptureSource,
        mime_type: Option<&str>,
        events: mpsc::UnboundedSender<EncoderEvent>,
    ) -> Result<Box<dyn MediaEncoder>> {
        if let Some(message) = &self.encoder_failure {
            return Err(LecternError::encoding(message.clone()));
        }

        let mime_type = mime_type
            .unwrap_or_else(|| default_container(source.mode()))
            .to_string();
        let core = Arc::new(Mutex::new(EncoderCore {
            tx: events,
            state: SimEncoderState::Inactive,
            sequence: 0,
        }));
        self.shared.lock().encoders.push(Arc::clone(&core));
        debug!("Simulated encoder created: {}", mime_type);

        Ok(Box::new(SimEncoder {
            mime_type,
            core,
            chunk_size: self.generated_chunk_size,
            generator: None,
        }))
    }
}

struct SimEncoder {
    mime_type: String,
    core: Arc<Mutex<EncoderCore>>,
    chunk_size: Option<usize>,
    generator: Option<JoinHandle<()>>,
}

impl SimEncoder {
    fn spawn_generator(&mut self, timeslice: Duration, size: usize) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime; simulated encoder will not generate chunks");
            return;
        };

        let core = Arc::clone(&self.core);
        self.generator = Some(runtime.spawn(async move {
            let start = tokio::time::Instant::now() + timeslice;
            let mut interval = tokio::time::interval_at(start, timeslice);
            loop {
                interval.tick().await;
                let keep_going = {
                    let mut guard = core.lock();
                    match guard.state {
                        SimEncoderState::Stopped => false,
                        SimEncoderState::Recording => {
                            guard.sequence += 1;
                            let fill = (guard.sequence % 251) as u8;
                            let chunk = Bytes::from(vec![fill; size]);
                            trace!("Simulated chunk {} ({} bytes)", guard.sequence, size);
                            guard.emit(EncoderEvent::Data(chunk))
                        }
                        _ => true,
                    }
                };
                if !keep_going {
                    break;
                }
            }
        }));
    }
}

impl MediaEncoder for SimEncoder {
    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn start(&mut self, timeslice: Duration) -> Result<()> {
        if timeslice.is_zero() {
            return Err(LecternError::encoding("timeslice must be non-zero"));
        }
        {
            let mut core = self.core.lock();
            if core.state != SimEncoderState::Inactive {
                return Err(LecternError::encoding("encoder already started"));
            }
            core.state = SimEncoderState::Recording;
        }
        if let Some(size) = self.chunk_size {
            self.spawn_generator(timeslice, size);
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let mut core = self.core.lock();
        if core.state == SimEncoderState::Recording {
            core.state = SimEncoderState::Paused;
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        let mut core = self.core.lock();
        if core.state == SimEncoderState::Paused {
            core.state = SimEncoderState::Recording;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        {
            let mut core = self.core.lock();
            if core.state == SimEncoderState::Stopped {
                return Ok(());
            }
            // Final flush of whatever was encoded since the last interval
            if let (Some(size), SimEncoderState::Recording | SimEncoderState::Paused) =
                (self.chunk_size, core.state)
            {
                core.sequence += 1;
                let fill = (core.sequence % 251) as u8;
                core.emit(EncoderEvent::Data(Bytes::from(vec![fill; size / 2])));
            }
            core.emit(EncoderEvent::Stopped);
            core.state = SimEncoderState::Stopped;
        }
        if let Some(generator) = self.generator.take() {
            generator.abort();
        }
        Ok(())
    }
}

impl Drop for SimEncoder {
    fn drop(&mut self) {
        if let Some(generator) = self.generator.take() {
            generator.abort();
        }
    }
}
