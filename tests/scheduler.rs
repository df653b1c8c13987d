//! Scheduler Integration Tests
//!
//! Tick handling, re-entrancy and shutdown on a paused clock.

mod common;

use std::sync::Arc;

use common::{secs, MockBackend, MockCamera, MockMicrophone, RecordingNotifier};
use soothsayer::adapters::StaticPermissions;
use soothsayer::core::{
    CaptureScheduler, PermissionGate, RateLimiter, RateLimiterState, RateLimits, SchedulerHandle,
    SchedulerSettings, SessionRunner, SessionSettings, UploadDispatcher,
};
use soothsayer::domain::SessionStatus;
use tempfile::TempDir;

struct Harness {
    handle: SchedulerHandle,
    mic: Arc<MockMicrophone>,
    backend: Arc<MockBackend>,
    dispatcher: Arc<UploadDispatcher>,
    notifier: Arc<RecordingNotifier>,
    _temp: TempDir,
}

fn start(
    permissions: StaticPermissions,
    recording_secs: u64,
    scheduler: SchedulerSettings,
    backend: Arc<MockBackend>,
) -> Harness {
    let temp = common::temp_dir();
    let mic = Arc::new(MockMicrophone::new(temp.path()));
    let camera = Arc::new(MockCamera::new(temp.path()));

    let limits = RateLimits {
        max_requests_per_minute: 100,
        request_cooldown_ms: 0,
    };
    let dispatcher = Arc::new(UploadDispatcher::new(
        backend.clone(),
        RateLimiter::new(limits),
    ));
    let session = SessionSettings {
        recording_duration_ms: recording_secs * 1000,
        frame_interval_ms: 10_000,
        device_timeout_ms: 1_000,
    };
    let runner = Arc::new(SessionRunner::new(
        mic.clone(),
        camera,
        dispatcher.clone(),
        session,
    ));

    let notifier = Arc::new(RecordingNotifier::default());
    let gate = Arc::new(PermissionGate::new(
        Arc::new(permissions),
        notifier.clone(),
    ));

    let handle = CaptureScheduler::new(runner, gate, scheduler).start();
    Harness {
        handle,
        mic,
        backend,
        dispatcher,
        notifier,
        _temp: temp,
    }
}

fn every_10s(trigger_analysis: bool) -> SchedulerSettings {
    SchedulerSettings {
        interval_ms: 10_000,
        trigger_analysis,
    }
}

fn audio_only() -> StaticPermissions {
    StaticPermissions {
        microphone: true,
        camera: false,
    }
}

#[tokio::test(start_paused = true)]
async fn test_tick_during_recording_is_skipped() {
    let h = start(audio_only(), 25, every_10s(true), MockBackend::new());

    // Ticks at t=0, 10s, 20s; the first session records until 25s
    tokio::time::sleep(secs(21)).await;

    let stats = h.handle.stats();
    assert_eq!(stats.ticks, 3);
    assert_eq!(stats.sessions_started, 1);
    assert_eq!(stats.ticks_skipped, 2);

    // Skipped ticks never touched the limiter
    assert_eq!(h.dispatcher.limiter_state().await, RateLimiterState::default());
    assert!(h.backend.calls().is_empty());

    // Stopping hands back the in-flight session, which still completes
    let in_flight = h.handle.stop().await.expect("session in flight");
    let session = in_flight.await.unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(h.backend.call_count("audio"), 1);
    assert_eq!(h.mic.max_active(), 1);

    // Camera denial is announced once
    assert_eq!(h.notifier.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_at_most_one_session_active() {
    let mut h = start(audio_only(), 15, every_10s(false), MockBackend::new());

    let mut finished = 0;
    while finished < 3 {
        let session = h.handle.next_report().await.unwrap();
        assert!(session.status.is_terminal());
        finished += 1;
    }

    let stats = h.handle.stats();
    assert!(stats.ticks_skipped >= 2, "{:?}", stats);
    assert_eq!(h.mic.max_active(), 1);
    assert_eq!(h.mic.started() as u64, stats.sessions_started);

    if let Some(in_flight) = h.handle.stop().await {
        in_flight.await.unwrap();
    }
    assert_eq!(h.mic.max_active(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_denied_microphone_skips_every_tick() {
    let permissions = StaticPermissions {
        microphone: false,
        camera: true,
    };
    let h = start(permissions, 5, every_10s(true), MockBackend::new());

    tokio::time::sleep(secs(35)).await;

    let stats = h.handle.stats();
    assert_eq!(stats.ticks, 4);
    assert_eq!(stats.sessions_started, 0);
    assert_eq!(stats.permission_denied, 4);
    assert_eq!(h.mic.started(), 0);

    // Notice on first denial only
    assert_eq!(h.notifier.count(), 1);
    assert!(h.handle.stop().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_finished_session_triggers_combined_analysis() {
    let mut h = start(audio_only(), 5, every_10s(true), MockBackend::new());

    let session = h.handle.next_report().await.unwrap();
    assert_eq!(session.status, SessionStatus::Completed);

    // Analysis runs on its own task
    tokio::time::sleep(secs(1)).await;
    assert_eq!(h.backend.call_count("combined"), 1);

    assert!(h.handle.stop().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_no_analysis_when_nothing_uploaded() {
    let backend = MockBackend::new();
    backend.fail("audio", 500);
    let mut h = start(audio_only(), 5, every_10s(true), backend);

    let session = h.handle.next_report().await.unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.failed_task_count(), 1);

    tokio::time::sleep(secs(1)).await;
    assert_eq!(h.backend.call_count("combined"), 0);

    h.handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_analysis_can_be_disabled() {
    let mut h = start(audio_only(), 5, every_10s(false), MockBackend::new());

    h.handle.next_report().await.unwrap();
    tokio::time::sleep(secs(1)).await;
    assert_eq!(h.backend.call_count("combined"), 0);

    h.handle.stop().await;
}
