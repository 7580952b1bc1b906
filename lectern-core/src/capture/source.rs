//! Exclusive handle over live capture tracks

use tracing::{debug, trace};

use super::{MediaStream, MediaTrack};
use crate::types::{CaptureMode, TrackKind};

/// A live camera, screen or microphone stream owned by one session.
///
/// Every track is stopped by [`CaptureSource::release`], and again on drop,
/// so no exit path can leave a device indicator lit.
#[derive(Debug)]
pub struct CaptureSource {
    mode: CaptureMode,
    tracks: Vec<Box<dyn MediaTrack>>,
    released: bool,
}

impl CaptureSource {
    /// Take ownership of an acquired stream
    pub fn new(mode: CaptureMode, stream: MediaStream) -> Self {
        debug!(
            "Capture source for {} with {} track(s)",
            mode,
            stream.tracks.len()
        );
        Self {
            mode,
            tracks: stream.tracks,
            released: false,
        }
    }

    /// Mode this source was acquired for
    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    /// Whether an audio track was granted
    pub fn has_audio(&self) -> bool {
        self.tracks.iter().any(|t| t.kind() == TrackKind::Audio)
    }

    /// Whether a video track was granted
    pub fn has_video(&self) -> bool {
        self.tracks.iter().any(|t| t.kind() == TrackKind::Video)
    }

    /// Total number of tracks
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Number of tracks still live
    pub fn live_tracks(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_live()).count()
    }

    /// Track labels, for display
    pub fn labels(&self) -> Vec<&str> {
        self.tracks.iter().map(|t| t.label()).collect()
    }

    /// Whether [`release`](Self::release) has run
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Stop every track. Safe to call any number of times.
    ///
    /// Returns the number of tracks that were live before the call.
    pub fn release(&mut self) -> usize {
        if self.released {
            return 0;
        }

        let mut stopped = 0;
        for track in &mut self.tracks {
            if track.is_live() {
                stopped += 1;
            }
            track.stop();
            trace!("Stopped {:?} track '{}'", track.kind(), track.label());
        }
        self.released = true;
        debug!("Released {} capture source ({} live track(s))", self.mode, stopped);
        stopped
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        self.release();
    }
}
