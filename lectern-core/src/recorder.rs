//! Chunk-buffering recorder
//!
//! Wraps a [`CaptureSource`] and the encoder created for it. Encoded data
//! arrives as [`EncoderEvent`]s on a channel and is buffered in arrival
//! order until the session finalizes it.

use bytes::Bytes;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::capture::{CaptureSource, MediaEnvironment};
use crate::encode::{negotiate_mime_type, EncoderEvent, MediaEncoder};
use crate::error::Result;

/// Recorder state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Recording,
    Paused,
    /// Stopped; waiting for or past the encoder's stop notification
    Inactive,
}

/// Active recorder over one capture source
pub struct Recorder {
    source: CaptureSource,
    encoder: Box<dyn MediaEncoder>,
    events: mpsc::UnboundedReceiver<EncoderEvent>,
    chunks: Vec<Bytes>,
    buffered_bytes: usize,
    mime_type: String,
    state: RecorderState,
    stop_complete: bool,
}

impl Recorder {
    /// Negotiate a MIME type, create the encoder and start it.
    ///
    /// On error the source is dropped, which releases it.
    pub fn start(
        env: &mut dyn MediaEnvironment,
        source: CaptureSource,
        timeslice: Duration,
    ) -> Result<Self> {
        let mode = source.mode();
        let preferred = negotiate_mime_type(mode, |m| env.is_type_supported(m));
        if preferred.is_none() {
            warn!(
                "No preferred {} format supported, using the encoder default",
                mode
            );
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut encoder = env.create_encoder(&source, preferred, tx)?;
        encoder.start(timeslice)?;
        let mime_type = encoder.mime_type().to_string();

        info!(
            "Recorder started: {} every {}ms",
            mime_type,
            timeslice.as_millis()
        );

        Ok(Self {
            source,
            encoder,
            events: rx,
            chunks: Vec::new(),
            buffered_bytes: 0,
            mime_type,
            state: RecorderState::Recording,
            stop_complete: false,
        })
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn source(&self) -> &CaptureSource {
        &self.source
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn buffered_bytes(&self) -> usize {
        self.buffered_bytes
    }

    /// Whether the encoder has reported [`EncoderEvent::Stopped`]
    pub fn is_stop_complete(&self) -> bool {
        self.stop_complete
    }

    /// Suspend encoding. Only valid while recording.
    pub fn pause(&mut self) -> Result<()> {
        if self.state != RecorderState::Recording {
            return Ok(());
        }
        self.encoder.pause()?;
        self.state = RecorderState::Paused;
        debug!("Recorder paused");
        Ok(())
    }

    /// Resume encoding. Only valid while paused.
    pub fn resume(&mut self) -> Result<()> {
        if self.state != RecorderState::Paused {
            return Ok(());
        }
        self.encoder.resume()?;
        self.state = RecorderState::Recording;
        debug!("Recorder resumed");
        Ok(())
    }

    /// Stop the encoder and release the source. Repeated calls do nothing.
    ///
    /// The source is released even if the encoder reports an error.
    pub fn stop(&mut self) -> Result<()> {
        if self.state == RecorderState::Inactive {
            return Ok(());
        }
        self.state = RecorderState::Inactive;
        let result = self.encoder.stop();
        self.source.release();
        debug!("Recorder stopped with {} chunk(s) buffered", self.chunks.len());
        result
    }

    /// Append a flushed chunk. Empty chunks are dropped.
    pub fn append_chunk(&mut self, data: Bytes) -> usize {
        if data.is_empty() {
            return 0;
        }
        let len = data.len();
        self.buffered_bytes += len;
        self.chunks.push(data);
        len
    }

    /// Record that the encoder has flushed everything
    pub fn mark_stop_complete(&mut self) {
        self.stop_complete = true;
        self.events.close();
    }

    /// Wait for the next encoder event; `None` once the stream is done
    pub async fn next_event(&mut self) -> Option<EncoderEvent> {
        if self.stop_complete {
            return None;
        }
        self.events.recv().await
    }

    /// Next encoder event if one is already queued
    pub fn try_next_event(&mut self) -> Option<EncoderEvent> {
        if self.stop_complete {
            return None;
        }
        self.events.try_recv().ok()
    }

    /// Take the buffered chunks and content type, consuming the recorder
    pub fn into_output(mut self) -> (Vec<Bytes>, String) {
        let chunks = std::mem::take(&mut self.chunks);
        let mime_type = std::mem::take(&mut self.mime_type);
        (chunks, mime_type)
    }

    /// Stop everything and drop buffered data
    pub fn discard(mut self) {
        if let Err(e) = self.stop() {
            debug!("Encoder stop during discard failed: {}", e);
        }
        self.source.release();
        let dropped = self.chunks.len();
        self.chunks.clear();
        debug!("Discarded {} buffered chunk(s)", dropped);
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.state != RecorderState::Inactive {
            self.state = RecorderState::Inactive;
            if let Err(e) = self.encoder.stop() {
                warn!("Encoder stop on drop failed: {}", e);
            }
        }
        self.source.release();
    }
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("state", &self.state)
            .field("mime_type", &self.mime_type)
            .field("chunks", &self.chunks.len())
            .field("buffered_bytes", &self.buffered_bytes)
            .field("stop_complete", &self.stop_complete)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{acquire, AcquireRequest};
    use crate::sim::SimulatedEnvironment;
    use crate::types::CaptureMode;

    async fn started(env: &mut SimulatedEnvironment, mode: CaptureMode) -> Recorder {
        let acquired = acquire(env, &AcquireRequest::new(mode)).await.unwrap();
        Recorder::start(env, acquired.source, Duration::from_secs(1)).unwrap()
    }

    #[tokio::test]
    async fn test_negotiates_first_supported_type() {
        let mut env = SimulatedEnvironment::new()
            .with_supported_types(["video/webm;codecs=vp8,opus", "video/mp4"]);
        let recorder = started(&mut env, CaptureMode::Camera).await;
        assert_eq!(recorder.mime_type(), "video/webm;codecs=vp8,opus");
        assert_eq!(recorder.state(), RecorderState::Recording);
    }

    #[tokio::test]
    async fn test_falls_back_to_encoder_default() {
        let mut env = SimulatedEnvironment::new().with_supported_types(Vec::<String>::new());
        let recorder = started(&mut env, CaptureMode::Audio).await;
        assert_eq!(recorder.mime_type(), "audio/webm");
    }

    #[tokio::test]
    async fn test_empty_chunks_dropped() {
        let mut env = SimulatedEnvironment::new();
        let mut recorder = started(&mut env, CaptureMode::Screen).await;
        assert_eq!(recorder.append_chunk(Bytes::new()), 0);
        assert_eq!(recorder.append_chunk(Bytes::from_static(b"xyz")), 3);
        assert_eq!(recorder.chunk_count(), 1);
        assert_eq!(recorder.buffered_bytes(), 3);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_releases() {
        let mut env = SimulatedEnvironment::new();
        let handle = env.handle();
        let mut recorder = started(&mut env, CaptureMode::Camera).await;
        recorder.pause().unwrap();
        assert_eq!(recorder.state(), RecorderState::Paused);

        recorder.stop().unwrap();
        recorder.stop().unwrap();
        assert!(recorder.source().is_released());
        assert_eq!(handle.live_tracks(), 0);

        // Exactly one stop notification
        assert_eq!(recorder.try_next_event(), Some(EncoderEvent::Stopped));
        assert_eq!(recorder.try_next_event(), None);
    }
}
