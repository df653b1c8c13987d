//! Command-line interface for soothsayer.
//!
//! Provides commands for running the capture loop, one-off captures and
//! uploads, backend analysis requests, and browsing session history.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};

use crate::adapters::backend::new_request_id;
use crate::adapters::{AnalysisBackend, BackendClient};
use crate::config::{self, paths, ResolvedConfig};
use crate::core::{RateLimiter, SessionJournal, UploadDispatcher};
use crate::domain::{CameraFacing, UploadTask};

pub mod capture;

use capture::Agent;

/// soothsayer - periodic audio and camera capture for sentiment analysis
#[derive(Parser, Debug)]
#[command(name = "soothsayer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Backend base URL (overrides config and SOOTHSAYER_BASE_URL)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture on an interval until Ctrl+C
    Run {
        /// Seconds between capture sessions (overrides config)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Do not request combined analysis after each session
        #[arg(long)]
        no_analysis: bool,
    },

    /// Run a single capture session now
    Capture {
        /// Do not request combined analysis afterwards
        #[arg(long)]
        no_analysis: bool,
    },

    /// Ask the backend to analyze the latest uploads together
    Analyze,

    /// Upload an existing media file
    Upload {
        /// File to upload
        file: PathBuf,

        /// What the file is
        #[arg(short, long, value_enum)]
        kind: MediaKind,

        /// Clip length reported for audio uploads
        #[arg(long, default_value = "5000")]
        duration_ms: u64,
    },

    /// Run face (front) or environment (back) sentiment on one image
    Sentiment {
        /// Image file
        image: PathBuf,

        /// Which camera took the image
        #[arg(short, long, value_enum, default_value = "front")]
        camera: CameraArg,
    },

    /// Check that the backend is reachable
    Health,

    /// List recent capture sessions
    Sessions {
        /// Maximum number of sessions to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Media kind for CLI uploads
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MediaKind {
    /// Audio clip
    Audio,

    /// Front camera still
    Front,

    /// Back camera still
    Back,
}

/// Camera for CLI (maps to CameraFacing)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CameraArg {
    Front,
    Back,
}

impl From<CameraArg> for CameraFacing {
    fn from(c: CameraArg) -> Self {
        match c {
            CameraArg::Front => CameraFacing::Front,
            CameraArg::Back => CameraFacing::Back,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let base_url = self.base_url;

        match self.command {
            Commands::Run {
                interval,
                no_analysis,
            } => {
                let cfg = config::config()?;
                let mut settings = cfg.scheduler;
                if let Some(secs) = interval {
                    settings.interval_ms = secs * 1000;
                }
                if no_analysis {
                    settings.trigger_analysis = false;
                }
                let agent = Agent::from_config(cfg, backend(cfg, base_url)?)?;
                capture::execute_run(agent, settings).await
            }
            Commands::Capture { no_analysis } => {
                let cfg = config::config()?;
                let agent = Agent::from_config(cfg, backend(cfg, base_url)?)?;
                let trigger = cfg.scheduler.trigger_analysis && !no_analysis;
                capture::execute_capture(agent, trigger).await
            }
            Commands::Analyze => {
                let cfg = config::config()?;
                analyze(backend(cfg, base_url)?).await
            }
            Commands::Upload {
                file,
                kind,
                duration_ms,
            } => {
                let cfg = config::config()?;
                upload(cfg, backend(cfg, base_url)?, &file, kind, duration_ms).await
            }
            Commands::Sentiment { image, camera } => {
                let cfg = config::config()?;
                sentiment(backend(cfg, base_url)?, &image, camera.into()).await
            }
            Commands::Health => {
                let cfg = config::config()?;
                health(backend(cfg, base_url)?).await
            }
            Commands::Sessions { limit } => list_sessions(limit).await,
            Commands::Config => show_config(base_url),
        }
    }
}

/// Backend client for the resolved base URL
fn backend(cfg: &ResolvedConfig, base_url: Option<String>) -> Result<Arc<dyn AnalysisBackend>> {
    let url = base_url.unwrap_or_else(|| cfg.base_url.clone());
    Ok(Arc::new(BackendClient::new(url, cfg.request_timeout)?))
}

/// Manual combined analysis; a failure is reported and exits non-zero
async fn analyze(backend: Arc<dyn AnalysisBackend>) -> Result<()> {
    let request_id = new_request_id();

    match backend.combined_analysis(&request_id).await {
        Ok(result) => {
            println!("{}", result.analysis);
            if let Some(raw) = result.raw_data {
                println!();
                if let Some(face) = raw.face_sentiment {
                    println!("Face:        {}", face);
                }
                if let Some(environment) = raw.environment_analysis {
                    println!("Environment: {}", environment);
                }
                if let Some(transcription) = raw.audio_transcription {
                    println!("Audio:       {}", transcription);
                }
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Upload one file through the rate-limited dispatcher
async fn upload(
    cfg: &ResolvedConfig,
    backend: Arc<dyn AnalysisBackend>,
    file: &Path,
    kind: MediaKind,
    duration_ms: u64,
) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File not found: {}", file.display());
    }

    let mut task = match kind {
        MediaKind::Audio => UploadTask::audio(file.to_path_buf(), Utc::now(), duration_ms),
        MediaKind::Front => UploadTask::photo(CameraFacing::Front, file.to_path_buf(), Utc::now()),
        MediaKind::Back => UploadTask::photo(CameraFacing::Back, file.to_path_buf(), Utc::now()),
    };

    let dispatcher = UploadDispatcher::new(backend, RateLimiter::new(cfg.rate_limit));
    let ack = dispatcher
        .upload(&mut task)
        .await
        .with_context(|| format!("Failed to upload {}", file.display()))?;

    println!("✅ Uploaded {} as {}", file.display(), task.kind.label());
    if let Some(name) = ack.latest_filename {
        println!("   Stored as:     {}", name);
    }
    if let Some(transcription) = ack.transcription {
        println!("   Transcription: {}", transcription);
    }
    Ok(())
}

async fn sentiment(
    backend: Arc<dyn AnalysisBackend>,
    image: &Path,
    facing: CameraFacing,
) -> Result<()> {
    let result = backend
        .analyze_image(image, facing)
        .await
        .with_context(|| format!("Failed to analyze {}", image.display()))?;

    match result.text() {
        Some(text) => println!("{}", text),
        None => println!("(no {} returned)", facing.analysis_type().as_str()),
    }
    Ok(())
}

async fn health(backend: Arc<dyn AnalysisBackend>) -> Result<()> {
    match backend.health_check().await {
        Ok(()) => {
            println!("✓ Backend is reachable");
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Backend unreachable: {}", e);
            std::process::exit(1);
        }
    }
}

/// List recent sessions from the journal
async fn list_sessions(limit: usize) -> Result<()> {
    let journal = SessionJournal::open_default()?;
    let sessions = journal
        .recent_sessions(limit)
        .await
        .context("Failed to read session journal")?;

    if sessions.is_empty() {
        println!("No sessions found");
        return Ok(());
    }

    println!(
        "{:<38} {:<20} {:<10} {:>4} {:>6}",
        "SESSION ID", "STARTED", "STATUS", "OK", "FAILED"
    );
    println!("{}", "-".repeat(82));

    for session in sessions {
        println!(
            "{:<38} {:<20} {:<10} {:>4} {:>6}",
            session.session_id,
            session.started_at.format("%Y-%m-%d %H:%M:%S"),
            session.status,
            session.uploads_succeeded,
            session.uploads_failed
        );
        if let Some(error) = &session.error {
            println!("    error: {}", error);
        }
        if let Some(analysis) = &session.analysis {
            println!("    analysis: {}", analysis);
        }
    }

    Ok(())
}

/// Show resolved configuration
fn show_config(base_url: Option<String>) -> Result<()> {
    let cfg = config::config()?;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("  SootheSayer Configuration");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:     {}", cfg.home.display());
    println!("  Journal:  {}", paths::session_journal_in(&cfg.home).display());
    println!("  Media:    {}", paths::media_dir_in(&cfg.home).display());
    println!("  Captures: {}", paths::capture_dir_in(&cfg.home).display());
    println!();
    println!("Backend:");
    println!("  Base URL: {}", base_url.as_deref().unwrap_or(&cfg.base_url));
    println!("  Timeout:  {}s", cfg.request_timeout.as_secs());
    println!();
    println!("Schedule:");
    println!("  Interval:        {}ms", cfg.scheduler.interval_ms);
    println!("  Recording:       {}ms", cfg.session.recording_duration_ms);
    println!("  Frame interval:  {}ms", cfg.session.frame_interval_ms);
    println!("  Device timeout:  {}ms", cfg.session.device_timeout_ms);
    println!("  Combined analysis: {}", cfg.scheduler.trigger_analysis);
    println!();
    println!("Rate limits:");
    println!("  Max per minute: {}", cfg.rate_limit.max_requests_per_minute);
    println!("  Cooldown:       {}ms", cfg.rate_limit.request_cooldown_ms);
    println!();
    println!("Devices:");
    println!("  Microphone:   {}", format_argv(&cfg.devices.microphone));
    println!("  Front camera: {}", format_argv(&cfg.devices.front_camera));
    println!("  Back camera:  {}", format_argv(&cfg.devices.back_camera));
    println!();
    println!("Permissions:");
    println!("  Microphone: {}", grant_label(cfg.permissions.microphone));
    println!("  Camera:     {}", grant_label(cfg.permissions.camera));

    Ok(())
}

fn format_argv(argv: &[String]) -> String {
    if argv.is_empty() {
        "(not configured)".to_string()
    } else {
        argv.join(" ")
    }
}

fn grant_label(granted: bool) -> &'static str {
    if granted {
        "granted"
    } else {
        "denied"
    }
}
