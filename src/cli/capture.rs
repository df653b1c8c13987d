//! Capture CLI commands.
//!
//! - `soothsayer run` - Capture on an interval until Ctrl+C
//! - `soothsayer capture` - Run a single session and exit

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::adapters::{
    AnalysisBackend, CommandCamera, CommandMicrophone, ConsoleNotifier, StaticPermissions,
};
use crate::config::{paths, ResolvedConfig};
use crate::core::{
    trigger_combined_analysis, CaptureClearance, CaptureScheduler, PermissionGate, RateLimiter,
    SchedulerSettings, SessionJournal, SessionRunner, UploadDispatcher,
};
use crate::domain::{CaptureSession, SessionStatus, TaskResult};
use crate::ingest::MediaStore;

/// Everything a capture needs, wired from configuration
pub(crate) struct Agent {
    pub runner: Arc<SessionRunner>,
    pub gate: Arc<PermissionGate>,
}

impl Agent {
    pub fn from_config(cfg: &ResolvedConfig, backend: Arc<dyn AnalysisBackend>) -> Result<Self> {
        let capture_dir = paths::capture_dir_in(&cfg.home);

        let microphone = Arc::new(CommandMicrophone::new(
            cfg.devices.microphone.clone(),
            &capture_dir,
        ));
        let camera = Arc::new(CommandCamera::new(cfg.devices.clone(), &capture_dir));
        let dispatcher = Arc::new(UploadDispatcher::new(
            backend,
            RateLimiter::new(cfg.rate_limit),
        ));

        let media = MediaStore::open_default().context("Failed to open media store")?;
        let journal = SessionJournal::open_default().context("Failed to open session journal")?;

        let runner = SessionRunner::new(microphone, camera, dispatcher, cfg.session)
            .with_media_store(media)
            .with_journal(journal);

        let permissions = StaticPermissions {
            microphone: cfg.permissions.microphone,
            camera: cfg.permissions.camera,
        };
        let gate = PermissionGate::new(Arc::new(permissions), Arc::new(ConsoleNotifier));

        Ok(Self {
            runner: Arc::new(runner),
            gate: Arc::new(gate),
        })
    }
}

/// Start the scheduler and print each finished session until Ctrl+C
pub(crate) async fn execute_run(agent: Agent, settings: SchedulerSettings) -> Result<()> {
    println!(
        "🎙️  Capturing every {}s ({}s clips). Press Ctrl+C to stop.",
        settings.interval().as_secs_f32(),
        agent.runner.settings().recording_duration().as_secs_f32()
    );
    println!();

    // Startup check; ticks re-check before every session
    if let CaptureClearance::Denied = agent.gate.check_capture().await {
        println!("⚠️  Microphone permission denied; ticks are skipped until it is granted.");
    }

    let mut handle = CaptureScheduler::new(agent.runner, agent.gate, settings).start();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            report = handle.next_report() => match report {
                Some(session) => print_session(&session),
                None => break,
            },
            _ = &mut ctrl_c => {
                println!();
                println!("🛑 Stopping scheduler...");
                break;
            }
        }
    }

    let stats = handle.stats();
    if let Some(in_flight) = handle.stop().await {
        println!("⏳ Waiting for the current session to finish...");
        match in_flight.await {
            Ok(session) => print_session(&session),
            Err(e) => eprintln!("Session ended abnormally: {}", e),
        }
    }

    println!();
    println!("Ticks:            {}", stats.ticks);
    println!("Sessions started: {}", stats.sessions_started);
    println!("Ticks skipped:    {}", stats.ticks_skipped);
    if stats.permission_denied > 0 {
        println!("Permission denied: {}", stats.permission_denied);
    }

    Ok(())
}

/// Run one session now
pub(crate) async fn execute_capture(agent: Agent, trigger_analysis: bool) -> Result<()> {
    let cameras = match agent.gate.check_capture().await {
        CaptureClearance::Denied => {
            anyhow::bail!("Microphone permission is required to record audio")
        }
        CaptureClearance::Allowed { cameras } => cameras,
    };

    let session = agent.runner.run(CaptureSession::new(), cameras).await;
    print_session(&session);

    let any_uploaded = session
        .tasks
        .iter()
        .any(|t| t.result == TaskResult::Succeeded);
    if trigger_analysis && any_uploaded {
        let analysis = trigger_combined_analysis(
            agent.runner.dispatcher().backend().clone(),
            agent.runner.journal().cloned(),
            session.id,
        );
        // Wait so the analysis is journaled before the process exits
        if tokio::time::timeout(Duration::from_secs(60), analysis)
            .await
            .is_err()
        {
            eprintln!("Combined analysis did not finish in time");
        }
    }

    if let SessionStatus::Failed { .. } = session.status {
        std::process::exit(1);
    }
    Ok(())
}

fn print_session(session: &CaptureSession) {
    let icon = match &session.status {
        SessionStatus::Completed => "✅",
        SessionStatus::Failed { .. } => "❌",
        _ => "•",
    };
    println!(
        "{} Session {} {} ({} uploads, {} failed)",
        icon,
        &session.id.to_string()[..8],
        session.status.name(),
        session.tasks.len(),
        session.failed_task_count()
    );

    if let SessionStatus::Failed { reason } = &session.status {
        println!("   Reason: {}", reason);
    }
    for task in &session.tasks {
        match &task.result {
            TaskResult::Failed(reason) => println!("   {:<12} failed: {}", task.kind.label(), reason),
            TaskResult::Succeeded => println!("   {:<12} uploaded", task.kind.label()),
            TaskResult::Pending => println!("   {:<12} pending", task.kind.label()),
        }
    }
}
