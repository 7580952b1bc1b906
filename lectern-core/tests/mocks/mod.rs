//! Mock infrastructure for testing
//!
//! Provides scripted media environments, test chunks and event helpers.

use bytes::Bytes;
use lectern_core::capture::{AcquireError, Capabilities};
use lectern_core::sim::{SimHandle, SimulatedEnvironment};
use lectern_core::{RecordingSession, SessionEvent};
use tokio::sync::broadcast;

/// Environment that grants every request
pub fn granting_env() -> (SimulatedEnvironment, SimHandle) {
    let env = SimulatedEnvironment::new();
    let handle = env.handle();
    (env, handle)
}

/// Environment with the given capabilities
pub fn env_with_capabilities(capabilities: Capabilities) -> (SimulatedEnvironment, SimHandle) {
    let env = SimulatedEnvironment::new().with_capabilities(capabilities);
    let handle = env.handle();
    (env, handle)
}

/// Environment whose first camera/microphone request is refused
pub fn refusing_env(err: AcquireError) -> (SimulatedEnvironment, SimHandle) {
    let env = SimulatedEnvironment::new().fail_user_media(err);
    let handle = env.handle();
    (env, handle)
}

/// Capabilities without camera/microphone access
pub fn no_user_media() -> Capabilities {
    Capabilities {
        user_media: false,
        ..Capabilities::full()
    }
}

/// Create a test chunk of `len` bytes filled with `fill`
pub fn test_chunk(len: usize, fill: u8) -> Bytes {
    Bytes::from(vec![fill; len])
}

/// Emit each chunk from the current encoder and apply them to the session
pub fn feed_chunks(session: &mut RecordingSession, handle: &SimHandle, chunks: &[Bytes]) {
    for chunk in chunks {
        handle.emit_chunk(chunk.clone());
    }
    session.process_pending();
}

/// Deliver `n` timer intervals
pub fn tick_n(session: &mut RecordingSession, n: usize) {
    for _ in 0..n {
        session.tick();
    }
}

/// Collect every event already broadcast
pub fn drain_events(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_contents() {
        let chunk = test_chunk(4, 7);
        assert_eq!(chunk.as_ref(), &[7, 7, 7, 7]);
    }

    #[test]
    fn test_no_user_media_keeps_display() {
        let caps = no_user_media();
        assert!(!caps.user_media);
        assert!(caps.display_media);
        assert!(caps.secure_context);
    }

    #[test]
    fn test_granting_env_starts_clean() {
        let (_env, handle) = granting_env();
        assert_eq!(handle.acquisition_calls(), 0);
        assert_eq!(handle.live_tracks(), 0);
        assert!(!handle.emit_chunk(test_chunk(1, 0)));
    }
}
