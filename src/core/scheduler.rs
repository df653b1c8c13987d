//! Interval scheduler for capture sessions.
//!
//! A single loop task owns the timer and the active-session slot. Each tick
//! either starts a new session (when none is active and the microphone is
//! permitted) or is skipped. Finished sessions trigger a fire-and-forget
//! combined analysis request.
//!
//! Stopping cancels future ticks only. An in-flight session is never aborted
//! mid-recording; its handle is returned to the caller instead.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::adapters::backend::new_request_id;
use crate::adapters::AnalysisBackend;
use crate::domain::{CaptureSession, SessionEvent, SessionEventType, TaskResult};

use super::journal::SessionJournal;
use super::permissions::{CaptureClearance, PermissionGate};
use super::session::SessionRunner;

/// Scheduler cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Time between ticks (default: 10s)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Request combined analysis after each session (default: true)
    #[serde(default = "default_trigger_analysis")]
    pub trigger_analysis: bool,
}

fn default_interval_ms() -> u64 {
    10_000
}
fn default_trigger_analysis() -> bool {
    true
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            trigger_analysis: default_trigger_analysis(),
        }
    }
}

impl SchedulerSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// What a tick should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    /// No session active; a new one may start
    Ready,

    /// A session is still recording or finalizing
    Skip { active: Uuid },
}

/// Re-entrancy guard: at most one active session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerState {
    active: Option<Uuid>,
    pub stats: SchedulerStats,
}

/// Tick counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub sessions_started: u64,
    pub ticks_skipped: u64,
    pub permission_denied: u64,
}

impl SchedulerState {
    pub fn active(&self) -> Option<Uuid> {
        self.active
    }

    /// Decide what a tick does
    pub fn on_tick(&mut self) -> TickDecision {
        self.stats.ticks += 1;
        match self.active {
            Some(active) => {
                self.stats.ticks_skipped += 1;
                TickDecision::Skip { active }
            }
            None => TickDecision::Ready,
        }
    }

    /// Claim the active slot; false if a session already holds it
    pub fn begin(&mut self, session_id: Uuid) -> bool {
        if self.active.is_some() {
            return false;
        }
        self.active = Some(session_id);
        self.stats.sessions_started += 1;
        true
    }

    /// Release the slot held by `session_id`
    pub fn finish(&mut self, session_id: Uuid) {
        if self.active == Some(session_id) {
            self.active = None;
        }
    }

    pub fn record_denied(&mut self) {
        self.stats.permission_denied += 1;
    }
}

/// Periodic capture driver
pub struct CaptureScheduler {
    runner: Arc<SessionRunner>,
    gate: Arc<PermissionGate>,
    settings: SchedulerSettings,
}

/// Control handle for a running scheduler
pub struct SchedulerHandle {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<Option<JoinHandle<CaptureSession>>>,
    stats: watch::Receiver<SchedulerStats>,
    reports: mpsc::UnboundedReceiver<CaptureSession>,
}

impl SchedulerHandle {
    /// Latest tick counters
    pub fn stats(&self) -> SchedulerStats {
        *self.stats.borrow()
    }

    /// Wait for the next finished session
    pub async fn next_report(&mut self) -> Option<CaptureSession> {
        self.reports.recv().await
    }

    /// Stop ticking. Returns the in-flight session, if any, so the caller
    /// can let it finish.
    pub async fn stop(self) -> Option<JoinHandle<CaptureSession>> {
        // The loop may already have exited; the join below reports why.
        let _ = self.stop_tx.send(());
        match self.task.await {
            Ok(in_flight) => in_flight,
            Err(e) => {
                error!(error = %e, "Scheduler loop ended abnormally");
                None
            }
        }
    }
}

impl CaptureScheduler {
    pub fn new(
        runner: Arc<SessionRunner>,
        gate: Arc<PermissionGate>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            runner,
            gate,
            settings,
        }
    }

    /// Start ticking; the first tick fires immediately
    pub fn start(self) -> SchedulerHandle {
        let (stop_tx, stop_rx) = oneshot::channel();
        let (stats_tx, stats_rx) = watch::channel(SchedulerStats::default());
        let (report_tx, report_rx) = mpsc::unbounded_channel();

        info!(interval = ?self.settings.interval(), "Starting capture scheduler");
        let task = tokio::spawn(self.run_loop(stop_rx, stats_tx, report_tx));

        SchedulerHandle {
            stop_tx,
            task,
            stats: stats_rx,
            reports: report_rx,
        }
    }

    async fn run_loop(
        self,
        mut stop_rx: oneshot::Receiver<()>,
        stats_tx: watch::Sender<SchedulerStats>,
        report_tx: mpsc::UnboundedSender<CaptureSession>,
    ) -> Option<JoinHandle<CaptureSession>> {
        let mut state = SchedulerState::default();
        let mut active: Option<(Uuid, JoinHandle<CaptureSession>)> = None;

        let mut ticker = tokio::time::interval(self.settings.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = &mut stop_rx => {
                    info!("Stopping capture scheduler");
                    break;
                }
                joined = join_active(&mut active) => {
                    if let Some((session_id, _)) = active.take() {
                        state.finish(session_id);
                    }
                    self.on_session_joined(joined, &report_tx);
                }
                _ = ticker.tick() => {
                    match state.on_tick() {
                        TickDecision::Skip { active } => {
                            info!(%active, "Skipping tick - session already active");
                        }
                        TickDecision::Ready => {
                            if let Some(started) = self.try_start(&mut state).await {
                                active = Some(started);
                            }
                        }
                    }
                }
            }
            stats_tx.send_replace(state.stats);
        }

        if let Some((session_id, _)) = &active {
            info!(%session_id, "Session still in flight; letting it finish");
        }
        active.map(|(_, handle)| handle)
    }

    /// Permission check + spawn, on a Ready tick
    async fn try_start(
        &self,
        state: &mut SchedulerState,
    ) -> Option<(Uuid, JoinHandle<CaptureSession>)> {
        let cameras = match self.gate.check_capture().await {
            CaptureClearance::Denied => {
                state.record_denied();
                info!("Skipping tick - microphone permission denied");
                return None;
            }
            CaptureClearance::Allowed { cameras } => cameras,
        };

        let session = CaptureSession::new();
        let session_id = session.id;
        if !state.begin(session_id) {
            return None;
        }

        info!(%session_id, "Starting capture session");
        let runner = self.runner.clone();
        let handle = tokio::spawn(async move { runner.run(session, cameras).await });
        Some((session_id, handle))
    }

    fn on_session_joined(
        &self,
        joined: Result<CaptureSession, JoinError>,
        report_tx: &mpsc::UnboundedSender<CaptureSession>,
    ) {
        let session = match joined {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Capture session task ended abnormally");
                return;
            }
        };

        let any_uploaded = session
            .tasks
            .iter()
            .any(|t| t.result == TaskResult::Succeeded);
        if self.settings.trigger_analysis && any_uploaded {
            trigger_combined_analysis(
                self.runner.dispatcher().backend().clone(),
                self.runner.journal().cloned(),
                session.id,
            );
        }

        // Receiver may be gone; reports are informational.
        let _ = report_tx.send(session);
    }
}

/// Resolve when the active session finishes; pending forever when idle
async fn join_active(
    active: &mut Option<(Uuid, JoinHandle<CaptureSession>)>,
) -> Result<CaptureSession, JoinError> {
    match active {
        Some((_, handle)) => handle.await,
        None => std::future::pending().await,
    }
}

/// Fire-and-forget combined analysis; failures are only logged
pub fn trigger_combined_analysis(
    backend: Arc<dyn AnalysisBackend>,
    journal: Option<SessionJournal>,
    session_id: Uuid,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let request_id = new_request_id();
        match backend.combined_analysis(&request_id).await {
            Ok(result) => {
                info!(%session_id, request_id, analysis = %result.analysis, "Combined analysis completed");
                if let Some(journal) = journal {
                    let event = SessionEvent::new(
                        session_id,
                        SessionEventType::AnalysisReceived,
                        result.analysis,
                    );
                    if let Err(e) = journal.append(&event).await {
                        warn!(error = %e, "Failed to write session journal");
                    }
                }
            }
            Err(e) => warn!(%session_id, request_id, error = %e, "Combined analysis failed"),
        }
    })
}
