//! Integration tests for the recording session state machine

mod mocks;

use std::time::Duration;

use lectern_core::capture::AcquireError;
use lectern_core::encode::is_audio_type;
use lectern_core::session::RecoveryAction;
use lectern_core::sim::SimulatedEnvironment;
use lectern_core::{
    CaptureMode, ErrorKind, RecorderConfig, RecordingSession, SessionEvent, SessionState,
};
use mocks::{
    drain_events, env_with_capabilities, feed_chunks, granting_env, no_user_media, refusing_env,
    test_chunk, tick_n,
};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_double_start_is_rejected() {
    for mode in CaptureMode::ALL {
        let (mut env, handle) = granting_env();
        let mut session = RecordingSession::new(mode);

        assert_ok!(session.start(&mut env).await);
        let err = assert_err!(session.start(&mut env).await);

        assert_eq!(err.kind(), ErrorKind::InvalidTransition, "{}", mode);
        assert_eq!(session.state(), SessionState::Recording, "{}", mode);
        assert_eq!(handle.acquisition_calls(), 1, "{}", mode);
    }
}

#[tokio::test]
async fn test_audio_recording_scenario() {
    let (mut env, handle) = granting_env();
    let mut session = RecordingSession::new(CaptureMode::Audio);

    session.start(&mut env).await.unwrap();
    assert!(session.audio_enabled());
    tick_n(&mut session, 3);
    session.pause().unwrap();
    // Paused intervals do not count
    tick_n(&mut session, 4);
    assert_eq!(session.elapsed_seconds(), 3);
    session.resume().unwrap();
    tick_n(&mut session, 2);
    assert_eq!(session.elapsed_seconds(), 5);

    feed_chunks(&mut session, &handle, &[test_chunk(10, 1), test_chunk(6, 2)]);
    session.stop().unwrap();
    let artifact = session.finish().await.unwrap();

    assert!(is_audio_type(artifact.content_type()));
    assert_eq!(artifact.len(), 16);
    assert_eq!(session.state(), SessionState::Finalized);
    assert_eq!(session.elapsed_seconds(), 5);
}

#[tokio::test]
async fn test_elapsed_is_monotonic_across_pause() {
    let (mut env, _handle) = granting_env();
    let mut session = RecordingSession::new(CaptureMode::Camera);
    session.start(&mut env).await.unwrap();

    let mut last = 0;
    for round in 0..4 {
        tick_n(&mut session, 2);
        assert!(session.elapsed_seconds() >= last);
        last = session.elapsed_seconds();
        if round % 2 == 0 {
            session.pause().unwrap();
            assert!(!session.is_timer_running());
        } else {
            session.resume().unwrap();
        }
        tick_n(&mut session, 1);
        assert!(session.elapsed_seconds() >= last);
    }
}

#[tokio::test]
async fn test_artifact_is_concatenation_of_chunks() {
    let (mut env, handle) = granting_env();
    let mut session = RecordingSession::new(CaptureMode::Screen);
    session.start(&mut env).await.unwrap();

    let chunks = [
        test_chunk(3, b'a'),
        test_chunk(0, 0),
        test_chunk(5, b'b'),
        test_chunk(2, b'c'),
    ];
    feed_chunks(&mut session, &handle, &chunks);
    assert_eq!(session.buffered_bytes(), 10);

    let artifact = session.finish().await.unwrap();
    assert_eq!(artifact.len(), chunks.iter().map(|c| c.len()).sum::<usize>());
    assert_eq!(artifact.data().as_ref(), b"aaabbbbbcc");
}

#[tokio::test]
async fn test_zero_chunks_still_finalizes() {
    let (mut env, _handle) = granting_env();
    let mut session = RecordingSession::new(CaptureMode::Camera);
    session.start(&mut env).await.unwrap();
    session.stop().unwrap();
    assert_eq!(session.state(), SessionState::Stopped);

    let artifact = session.finish().await.unwrap();
    assert!(artifact.is_empty());
    assert_eq!(session.state(), SessionState::Finalized);
}

#[tokio::test]
async fn test_tracks_released_on_stop() {
    let (mut env, handle) = granting_env();
    let mut session = RecordingSession::new(CaptureMode::Camera);
    session.start(&mut env).await.unwrap();
    assert_eq!(handle.live_tracks(), 2);
    assert_eq!(session.live_tracks(), 2);

    session.stop().unwrap();
    assert_eq!(handle.live_tracks(), 0);
}

#[tokio::test]
async fn test_tracks_released_on_reset() {
    let (mut env, handle) = granting_env();
    let mut session = RecordingSession::new(CaptureMode::Screen);
    session.start(&mut env).await.unwrap();
    session.pause().unwrap();

    session.reset();
    assert_eq!(handle.live_tracks(), 0);
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.elapsed_seconds(), 0);
}

#[tokio::test]
async fn test_tracks_released_on_encoder_error() {
    let (mut env, handle) = granting_env();
    let mut session = RecordingSession::new(CaptureMode::Camera);
    session.start(&mut env).await.unwrap();
    feed_chunks(&mut session, &handle, &[test_chunk(8, 1)]);

    handle.emit_error("disk full");
    session.process_pending();

    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(handle.live_tracks(), 0);
    assert!(session.artifact().is_none());
    let failure = session.failure().unwrap();
    assert_eq!(failure.kind, ErrorKind::PlaybackOrEncodingFault);
    assert_eq!(failure.action, RecoveryAction::Reset);
}

#[tokio::test]
async fn test_tracks_released_on_drop() {
    let (mut env, handle) = granting_env();
    {
        let mut session = RecordingSession::new(CaptureMode::Camera);
        session.start(&mut env).await.unwrap();
        assert_eq!(handle.live_tracks(), 2);
    }
    assert_eq!(handle.live_tracks(), 0);
}

#[tokio::test]
async fn test_unsupported_camera_never_acquires() {
    let (mut env, handle) = env_with_capabilities(no_user_media());
    let mut session = RecordingSession::new(CaptureMode::Camera);

    let err = session.start(&mut env).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedEnvironment);
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(session.failure().unwrap().action, RecoveryAction::ManualUpload);
    assert_eq!(handle.acquisition_calls(), 0);
}

#[tokio::test]
async fn test_screen_fallback_drops_audio() {
    let mut env =
        SimulatedEnvironment::new().fail_display_media(AcquireError::other("overconstrained"));
    let handle = env.handle();
    let mut session = RecordingSession::new(CaptureMode::Screen);
    let mut events = session.subscribe();

    session.start(&mut env).await.unwrap();

    assert_eq!(session.state(), SessionState::Recording);
    assert!(!session.audio_enabled());
    assert_eq!(handle.display_media_calls(), 2);
    let requests = handle.requests();
    assert!(requests[0].audio.is_some());
    assert!(requests[1].audio.is_none());
    assert!(drain_events(&mut events).contains(&SessionEvent::AudioUnavailable));
}

#[tokio::test]
async fn test_screen_fallback_failure_is_acquisition_failure() {
    let mut env = SimulatedEnvironment::new()
        .fail_display_media(AcquireError::other("overconstrained"))
        .fail_display_media(AcquireError::other("no display"));
    let handle = env.handle();
    let mut session = RecordingSession::new(CaptureMode::Screen);

    let err = session.start(&mut env).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AcquisitionFailed);
    assert_eq!(session.failure().unwrap().action, RecoveryAction::Retry);
    assert_eq!(handle.display_media_calls(), 2);
    assert_eq!(handle.live_tracks(), 0);
}

#[tokio::test]
async fn test_screen_picker_dismissed_is_permission_denied() {
    let mut env = SimulatedEnvironment::new()
        .fail_display_media(AcquireError::other("overconstrained"))
        .fail_display_media(AcquireError::not_allowed("user dismissed picker"));
    let handle = env.handle();
    let mut session = RecordingSession::new(CaptureMode::Screen);

    let err = session.start(&mut env).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert!(session.failure().unwrap().message.contains("screen"));
    assert_eq!(handle.display_media_calls(), 2);
    assert_eq!(handle.live_tracks(), 0);
}

#[tokio::test]
async fn test_zero_flush_interval_never_acquires() {
    let (mut env, handle) = granting_env();
    let config = RecorderConfig::default().with_flush_interval(Duration::ZERO);
    let mut session = RecordingSession::with_config(CaptureMode::Camera, &config);

    let err = assert_err!(session.start(&mut env).await);
    assert_eq!(err.kind(), ErrorKind::Config);
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(handle.acquisition_calls(), 0);
}

#[tokio::test]
async fn test_permission_denied_then_retry() {
    let (mut env, handle) = refusing_env(AcquireError::not_allowed("denied"));
    let mut session = RecordingSession::new(CaptureMode::Camera);

    let err = session.start(&mut env).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert!(session.failure().unwrap().message.contains("camera"));

    session.reset();
    session.start(&mut env).await.unwrap();
    assert_eq!(session.state(), SessionState::Recording);
    assert_eq!(handle.acquisition_calls(), 2);
}

#[tokio::test]
async fn test_missing_device() {
    let (mut env, _handle) = refusing_env(AcquireError::not_found("no microphone"));
    let mut session = RecordingSession::new(CaptureMode::Audio);

    let err = session.start(&mut env).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeviceNotFound);
    assert!(session.failure().unwrap().message.contains("microphone"));
}

#[tokio::test]
async fn test_encoder_creation_failure_releases_source() {
    let mut env = SimulatedEnvironment::new().fail_encoder("no codec");
    let handle = env.handle();
    let mut session = RecordingSession::new(CaptureMode::Camera);

    let err = session.start(&mut env).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PlaybackOrEncodingFault);
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(handle.acquisition_calls(), 1);
    assert_eq!(handle.live_tracks(), 0);
}

#[tokio::test]
async fn test_invalid_transitions() {
    let (mut env, _handle) = granting_env();
    let mut session = RecordingSession::new(CaptureMode::Camera);

    assert_eq!(session.pause().unwrap_err().kind(), ErrorKind::InvalidTransition);
    assert_eq!(session.resume().unwrap_err().kind(), ErrorKind::InvalidTransition);
    assert_eq!(session.stop().unwrap_err().kind(), ErrorKind::InvalidTransition);

    session.start(&mut env).await.unwrap();
    assert_eq!(session.resume().unwrap_err().kind(), ErrorKind::InvalidTransition);
    assert!(session.set_audio_enabled(false).is_err());

    session.finish().await.unwrap();
    // Stop after finalizing does nothing
    assert!(session.stop().is_ok());
    assert_eq!(session.state(), SessionState::Finalized);
    assert_eq!(session.pause().unwrap_err().kind(), ErrorKind::InvalidTransition);
}

#[tokio::test]
async fn test_source_ended_finalizes() {
    let (mut env, handle) = granting_env();
    let mut session = RecordingSession::new(CaptureMode::Screen);
    session.start(&mut env).await.unwrap();
    feed_chunks(&mut session, &handle, &[test_chunk(4, 9)]);

    handle.end_source();
    session.process_pending();

    assert_eq!(session.state(), SessionState::Finalized);
    assert_eq!(session.artifact().unwrap().len(), 4);
}

#[tokio::test]
async fn test_state_change_events() {
    let (mut env, _handle) = granting_env();
    let mut session = RecordingSession::new(CaptureMode::Camera);
    let mut events = session.subscribe();

    session.start(&mut env).await.unwrap();
    session.tick();
    session.stop().unwrap();
    session.finish().await.unwrap();

    let events = drain_events(&mut events);
    let transitions: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::StateChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            (SessionState::Idle, SessionState::Acquiring),
            (SessionState::Acquiring, SessionState::Recording),
            (SessionState::Recording, SessionState::Stopped),
            (SessionState::Stopped, SessionState::Finalized),
        ]
    );
    assert!(events.contains(&SessionEvent::Tick(1)));
}

#[tokio::test]
async fn test_reset_restores_requested_audio() {
    let mut env = SimulatedEnvironment::new().with_display_audio(false);
    let mut session = RecordingSession::new(CaptureMode::Screen);

    session.start(&mut env).await.unwrap();
    assert!(!session.audio_enabled());

    session.reset();
    assert!(session.audio_enabled());
    session.set_audio_enabled(false).unwrap();
    assert!(!session.audio_enabled());
}

#[tokio::test(start_paused = true)]
async fn test_generated_chunks_over_time() {
    let mut env = SimulatedEnvironment::new().with_generated_chunks(100);
    let config = RecorderConfig::default().with_flush_interval(Duration::from_secs(1));
    let mut session = RecordingSession::with_config(CaptureMode::Camera, &config);

    assert_ok!(session.start(&mut env).await);
    tokio::time::sleep(Duration::from_millis(3500)).await;
    session.process_pending();
    assert_eq!(session.buffered_bytes(), 300);

    let artifact = session.finish().await.unwrap();
    // Three full intervals plus the final flush on stop
    assert_eq!(artifact.len(), 350);
}
