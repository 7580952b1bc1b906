//! Stream acquisition
//!
//! Turns a mode and quality preference into constraints, asks the
//! environment for a stream and maps refusals onto [`LecternError`].
//! Screen capture retries once with video-only default constraints.

use tracing::{debug, info, warn};

use super::{
    AcquireError, AcquireErrorKind, AudioConstraints, CaptureSource, MediaConstraints,
    MediaEnvironment, VideoConstraints,
};
use crate::error::{LecternError, Result};
use crate::types::{CaptureMode, Quality};

/// Default screen capture frame rate
pub const DEFAULT_SCREEN_FPS: u32 = 30;

/// Parameters for one acquisition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquireRequest {
    pub mode: CaptureMode,
    pub quality: Quality,
    pub audio_enabled: bool,
    pub screen_fps: u32,
}

impl AcquireRequest {
    pub fn new(mode: CaptureMode) -> Self {
        Self {
            mode,
            quality: Quality::default(),
            audio_enabled: true,
            screen_fps: DEFAULT_SCREEN_FPS,
        }
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_audio(mut self, enabled: bool) -> Self {
        self.audio_enabled = enabled;
        self
    }

    pub fn with_screen_fps(mut self, fps: u32) -> Self {
        self.screen_fps = fps;
        self
    }

    /// Constraints for the primary request
    pub fn constraints(&self) -> MediaConstraints {
        let (width, height) = self.quality.resolution();
        match self.mode {
            CaptureMode::Camera => MediaConstraints {
                video: Some(VideoConstraints {
                    width: Some(width),
                    height: Some(height),
                    frame_rate: None,
                }),
                audio: self.audio_enabled.then(AudioConstraints::default),
            },
            CaptureMode::Screen => MediaConstraints {
                video: Some(VideoConstraints {
                    width: Some(width),
                    height: Some(height),
                    frame_rate: Some(self.screen_fps),
                }),
                audio: self.audio_enabled.then(AudioConstraints::default),
            },
            CaptureMode::Audio => MediaConstraints {
                video: None,
                audio: Some(AudioConstraints::voice()),
            },
        }
    }

    /// Minimal screen request used after the primary one fails
    pub fn screen_fallback_constraints() -> MediaConstraints {
        MediaConstraints {
            video: Some(VideoConstraints::default()),
            audio: None,
        }
    }
}

/// A successfully acquired source
#[derive(Debug)]
pub struct Acquired {
    pub source: CaptureSource,
    /// Audio actually granted: requested (always, for audio mode) and present
    pub audio_enabled: bool,
    /// The screen fallback request was used
    pub used_fallback: bool,
}

/// Request a live stream for `request.mode`
pub async fn acquire(env: &mut dyn MediaEnvironment, request: &AcquireRequest) -> Result<Acquired> {
    let mode = request.mode;
    let constraints = request.constraints();
    debug!("Requesting {} stream: {:?}", mode, constraints);

    let (stream, used_fallback) = match mode {
        CaptureMode::Camera | CaptureMode::Audio => {
            let stream = env
                .get_user_media(&constraints)
                .await
                .map_err(|e| map_acquire_error(mode, e))?;
            (stream, false)
        }
        CaptureMode::Screen => match env.get_display_media(&constraints).await {
            Ok(stream) => (stream, false),
            Err(primary) => {
                warn!(
                    "Screen capture request failed ({}), retrying with video-only defaults",
                    primary
                );
                let fallback = AcquireRequest::screen_fallback_constraints();
                let stream = env
                    .get_display_media(&fallback)
                    .await
                    .map_err(|e| match e.kind {
                        AcquireErrorKind::Other => LecternError::acquisition(format!(
                            "screen capture failed: {} (fallback: {})",
                            primary, e
                        )),
                        _ => map_acquire_error(mode, e),
                    })?;
                (stream, true)
            }
        },
    };

    let source = CaptureSource::new(mode, stream);
    let wants_audio = request.audio_enabled || mode == CaptureMode::Audio;
    let audio_enabled = wants_audio && source.has_audio();
    if wants_audio && !audio_enabled {
        warn!("{} capture continues without audio", mode);
    }

    info!(
        "Acquired {} source: {} track(s), audio {}{}",
        mode,
        source.track_count(),
        if audio_enabled { "on" } else { "off" },
        if used_fallback { " (fallback)" } else { "" }
    );

    Ok(Acquired {
        source,
        audio_enabled,
        used_fallback,
    })
}

/// Map an environment refusal onto the error taxonomy
pub fn map_acquire_error(mode: CaptureMode, err: AcquireError) -> LecternError {
    match err.kind {
        AcquireErrorKind::NotAllowed => LecternError::PermissionDenied {
            mode,
            detail: err.message,
        },
        AcquireErrorKind::NotFound => LecternError::DeviceNotFound {
            mode,
            detail: err.message,
        },
        AcquireErrorKind::Other => LecternError::acquisition(err.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_constraints_follow_quality() {
        let c = AcquireRequest::new(CaptureMode::Camera)
            .with_quality(Quality::FullHd)
            .constraints();
        let video = c.video.unwrap();
        assert_eq!(video.width, Some(1920));
        assert_eq!(video.height, Some(1080));
        assert!(c.audio.is_some());
    }

    #[test]
    fn test_camera_without_audio() {
        let c = AcquireRequest::new(CaptureMode::Camera)
            .with_audio(false)
            .constraints();
        assert!(c.audio.is_none());
    }

    #[test]
    fn test_screen_constraints_carry_frame_rate() {
        let c = AcquireRequest::new(CaptureMode::Screen)
            .with_screen_fps(15)
            .constraints();
        assert_eq!(c.video.unwrap().frame_rate, Some(15));
    }

    #[test]
    fn test_audio_constraints_ignore_quality() {
        let c = AcquireRequest::new(CaptureMode::Audio)
            .with_quality(Quality::Sd)
            .with_audio(false)
            .constraints();
        assert!(c.video.is_none());
        assert_eq!(c.audio, Some(AudioConstraints::voice()));
    }

    #[test]
    fn test_fallback_is_video_only() {
        let c = AcquireRequest::screen_fallback_constraints();
        assert_eq!(c.video, Some(VideoConstraints::default()));
        assert!(c.audio.is_none());
    }

    #[test]
    fn test_error_mapping() {
        let err = map_acquire_error(CaptureMode::Camera, AcquireError::not_allowed("denied"));
        assert!(matches!(err, LecternError::PermissionDenied { .. }));

        let err = map_acquire_error(CaptureMode::Audio, AcquireError::not_found("no mic"));
        assert!(matches!(err, LecternError::DeviceNotFound { .. }));

        let err = map_acquire_error(CaptureMode::Screen, AcquireError::other("busy"));
        assert!(matches!(err, LecternError::AcquisitionFailed(_)));
    }
}
