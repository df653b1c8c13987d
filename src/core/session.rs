//! Capture session runner.
//!
//! Drives one [`CaptureSession`] through its lifecycle:
//!
//! ```text
//! Idle ──start mic──▶ Recording ──duration──▶ Finalizing ──▶ Completed
//!   │                  (frame sub-loop)           │
//!   └──start failed──▶ Failed ◀──stop failed──────┘
//! ```
//!
//! Every device call is bounded by a timeout so a session always reaches a
//! terminal state. Per-artifact failures (a camera error, a failed upload)
//! are logged and never abort the session.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::{timeout, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::adapters::{Camera, DeviceError, Microphone};
use crate::domain::{
    CameraFacing, CaptureSession, SessionError, SessionEvent, SessionEventType, UploadTask,
};
use crate::ingest::MediaStore;

use super::dispatcher::UploadDispatcher;
use super::journal::SessionJournal;

/// Timing for a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// How long audio is recorded (default: 5s)
    #[serde(default = "default_recording_ms")]
    pub recording_duration_ms: u64,

    /// Gap between front/back still captures while recording (default: 10s)
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// Upper bound on any single device call (default: 15s)
    #[serde(default = "default_device_timeout_ms")]
    pub device_timeout_ms: u64,
}

fn default_recording_ms() -> u64 {
    5_000
}
fn default_frame_interval_ms() -> u64 {
    10_000
}
fn default_device_timeout_ms() -> u64 {
    15_000
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            recording_duration_ms: default_recording_ms(),
            frame_interval_ms: default_frame_interval_ms(),
            device_timeout_ms: default_device_timeout_ms(),
        }
    }
}

impl SessionSettings {
    pub fn recording_duration(&self) -> Duration {
        Duration::from_millis(self.recording_duration_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    pub fn device_timeout(&self) -> Duration {
        Duration::from_millis(self.device_timeout_ms)
    }
}

/// Runs capture sessions against a set of devices
pub struct SessionRunner {
    microphone: Arc<dyn Microphone>,
    camera: Arc<dyn Camera>,
    dispatcher: Arc<UploadDispatcher>,
    media: Option<MediaStore>,
    journal: Option<SessionJournal>,
    settings: SessionSettings,
}

impl SessionRunner {
    pub fn new(
        microphone: Arc<dyn Microphone>,
        camera: Arc<dyn Camera>,
        dispatcher: Arc<UploadDispatcher>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            microphone,
            camera,
            dispatcher,
            media: None,
            journal: None,
            settings,
        }
    }

    /// Copy captures into a persistent media directory before upload
    pub fn with_media_store(mut self, media: MediaStore) -> Self {
        self.media = Some(media);
        self
    }

    /// Record session lifecycle events
    pub fn with_journal(mut self, journal: SessionJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn dispatcher(&self) -> &Arc<UploadDispatcher> {
        &self.dispatcher
    }

    pub fn journal(&self) -> Option<&SessionJournal> {
        self.journal.as_ref()
    }

    /// Run a session to a terminal state.
    ///
    /// `cameras` is false when camera permission is missing; the session
    /// then records audio only.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn run(&self, mut session: CaptureSession, cameras: bool) -> CaptureSession {
        let started = Instant::now();
        self.record(SessionEvent::new(
            session.id,
            SessionEventType::SessionStarted,
            format!("Capture started (cameras: {})", cameras),
        ))
        .await;

        // Idle → Recording
        let handle = match self.device_call(self.microphone.start_recording()).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "Failed to start recording");
                self.finish_failed(&mut session, format!("start recording: {}", e), started)
                    .await;
                return session;
            }
        };
        advance(&mut session, CaptureSession::begin_recording);
        info!("Recording started");

        if cameras {
            self.run_frame_loop(&mut session).await;
        } else {
            tokio::time::sleep(self.settings.recording_duration()).await;
        }

        // Recording → Finalizing
        advance(&mut session, CaptureSession::begin_finalizing);
        let audio = match self.device_call(handle.stop()).await {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "Failed to finalize recording");
                self.finish_failed(&mut session, format!("stop recording: {}", e), started)
                    .await;
                return session;
            }
        };
        info!(file = %audio.display(), "Recording saved");

        let task = UploadTask::audio(
            audio,
            Utc::now(),
            self.settings.recording_duration_ms,
        );
        let sent = self.dispatch(&mut session, task).await;
        session.audio = Some(sent);

        // Finalizing → Completed
        advance(&mut session, CaptureSession::complete);
        let failed = session.failed_task_count();
        info!(
            tasks = session.tasks.len(),
            failed,
            "Capture session completed"
        );
        self.record(
            SessionEvent::new(
                session.id,
                SessionEventType::SessionCompleted,
                format!("{} uploads, {} failed", session.tasks.len(), failed),
            )
            .with_duration(started.elapsed().as_millis() as u64),
        )
        .await;

        session
    }

    /// Capture stills on a fixed interval until the recording duration ends
    async fn run_frame_loop(&self, session: &mut CaptureSession) {
        let deadline = tokio::time::sleep(self.settings.recording_duration());
        tokio::pin!(deadline);

        let mut frames = tokio::time::interval(self.settings.frame_interval());
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = &mut deadline => break,
                _ = frames.tick() => self.capture_frames(session).await,
            }
        }
        debug!("Frame capture stopped");
    }

    /// One front + one back still, each uploaded independently
    async fn capture_frames(&self, session: &mut CaptureSession) {
        let mut captured = Vec::with_capacity(2);

        for facing in [CameraFacing::Front, CameraFacing::Back] {
            match self.device_call(self.camera.take_picture(facing)).await {
                Ok(path) => {
                    debug!(camera = %facing, file = %path.display(), "Frame captured");
                    let task = UploadTask::photo(facing, path, Utc::now());
                    let stored = self.dispatch(session, task).await;
                    session.record_photo(facing, stored);
                    captured.push(facing.as_str());
                }
                Err(e) => warn!(camera = %facing, error = %e, "Frame capture failed"),
            }
        }

        debug!(captured = ?captured, "Frame capture tick finished");
    }

    /// Persist, upload and journal one task; returns the file that was sent
    async fn dispatch(&self, session: &mut CaptureSession, mut task: UploadTask) -> PathBuf {
        if let Some(media) = &self.media {
            match media
                .persist(&task.file, task.kind, task.metadata.timestamp)
                .await
            {
                Ok(stored) => task.file = stored,
                Err(e) => warn!(kind = %task.kind, error = %e, "Failed to persist capture"),
            }
        }

        // Outcome is recorded on the task; errors stop here.
        let _ = self.dispatcher.upload(&mut task).await;

        self.record(
            SessionEvent::new(
                session.id,
                SessionEventType::TaskResolved,
                format!("{} upload {}", task.kind, task.file.display()),
            )
            .with_task(task.kind, task.result.clone()),
        )
        .await;

        let file = task.file.clone();
        session.tasks.push(task);
        file
    }

    async fn finish_failed(&self, session: &mut CaptureSession, reason: String, started: Instant) {
        if let Err(e) = session.fail(reason.clone()) {
            warn!(error = %e, "Unexpected session transition");
        }
        self.record(
            SessionEvent::new(session.id, SessionEventType::SessionFailed, "Capture failed")
                .with_error(reason)
                .with_duration(started.elapsed().as_millis() as u64),
        )
        .await;
    }

    /// Bound a device call by the configured timeout
    async fn device_call<T, F>(&self, call: F) -> Result<T, DeviceError>
    where
        F: std::future::Future<Output = Result<T, DeviceError>>,
    {
        let limit = self.settings.device_timeout();
        timeout(limit, call).await.unwrap_or_else(|_| {
            Err(DeviceError::Unavailable(format!(
                "device call timed out after {:?}",
                limit
            )))
        })
    }

    async fn record(&self, event: SessionEvent) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.append(&event).await {
                warn!(error = %e, "Failed to write session journal");
            }
        }
    }
}

/// Apply a lifecycle transition that the runner's control flow guarantees
fn advance(session: &mut CaptureSession, step: fn(&mut CaptureSession) -> Result<(), SessionError>) {
    if let Err(e) = step(session) {
        warn!(error = %e, "Unexpected session transition");
    }
}
