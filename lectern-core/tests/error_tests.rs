//! Integration tests for error classification and recovery

use lectern_core::error::ResultExt;
use lectern_core::session::{Failure, RecoveryAction};
use lectern_core::{CaptureMode, ErrorKind, LecternError, Result, SessionState};

#[test]
fn test_error_display() {
    let err = LecternError::UnsupportedEnvironment(CaptureMode::Screen);
    assert_eq!(
        err.to_string(),
        "Recording screen is not supported in this environment"
    );

    let err = LecternError::InvalidTransition {
        action: "pause",
        state: SessionState::Idle,
    };
    assert_eq!(err.to_string(), "Cannot pause while idle");
}

#[test]
fn test_kind_looks_through_context() {
    let err = LecternError::PermissionDenied {
        mode: CaptureMode::Camera,
        detail: "NotAllowedError".to_string(),
    }
    .with_context("starting session")
    .with_context("recording view");

    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert!(err.to_string().starts_with("recording view: starting session:"));
}

#[test]
fn test_result_context() {
    let result: Result<()> = Err(LecternError::encoding("muxer crashed"));
    let err = result.context("finalizing").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PlaybackOrEncodingFault);
    assert!(err.to_string().contains("muxer crashed"));
}

#[test]
fn test_user_messages_are_mode_aware() {
    let denied = |mode| LecternError::PermissionDenied {
        mode,
        detail: String::new(),
    };
    assert!(denied(CaptureMode::Camera)
        .user_message(CaptureMode::Camera)
        .contains("camera and microphone"));
    assert!(denied(CaptureMode::Audio)
        .user_message(CaptureMode::Audio)
        .contains("microphone"));

    let unsupported = LecternError::UnsupportedEnvironment(CaptureMode::Screen);
    assert!(unsupported
        .user_message(CaptureMode::Screen)
        .contains("upload a file"));
}

#[test]
fn test_failure_recovery_actions() {
    let mode = CaptureMode::Camera;
    let cases = [
        (
            LecternError::UnsupportedEnvironment(mode),
            RecoveryAction::ManualUpload,
        ),
        (
            LecternError::DeviceNotFound {
                mode,
                detail: String::new(),
            },
            RecoveryAction::Retry,
        ),
        (LecternError::acquisition("overconstrained"), RecoveryAction::Retry),
        (LecternError::encoding("crashed"), RecoveryAction::Reset),
    ];

    for (err, action) in cases {
        let failure = Failure::from_error(&err, mode);
        assert_eq!(failure.action, action, "{}", err);
        assert_eq!(failure.kind, err.kind());
    }
}

#[test]
fn test_user_hints() {
    assert!(LecternError::UnsupportedEnvironment(CaptureMode::Audio)
        .user_hint()
        .is_some());
    assert!(LecternError::config("bad").user_hint().is_some());
    assert!(LecternError::NoArtifact.user_hint().is_none());
}

#[test]
fn test_recoverability() {
    assert!(LecternError::acquisition("x").is_user_recoverable());
    assert!(LecternError::encoding("x").is_user_recoverable());
    let io = LecternError::from(std::io::Error::other("disk gone"));
    assert!(!io.is_user_recoverable());
    assert_eq!(io.kind(), ErrorKind::Io);
}

#[test]
fn test_failure_serializes() {
    let failure = Failure::from_error(&LecternError::encoding("x"), CaptureMode::Audio);
    let json = serde_json::to_string(&failure).unwrap();
    assert!(json.contains("\"kind\":\"playback_or_encoding_fault\""));
    assert!(json.contains("\"action\":\"reset\""));
}
