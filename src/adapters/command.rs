//! Command-backed capture devices.
//!
//! Desktop hosts have no camera/microphone SDK in this crate; capture is
//! delegated to external programs (ffmpeg, imagesnap, fswebcam, ...). Each
//! command is an argv list where `{output}` is replaced by the target path.
//!
//! The microphone spawns a long-running recorder and stops it by writing
//! `q` to its stdin (ffmpeg's graceful quit), killing it only if it does not
//! exit within the stop timeout.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::time::timeout;

use super::device::{Camera, DeviceError, Microphone, RecordingHandle};
use crate::domain::CameraFacing;

/// Placeholder substituted with the output file path
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Capture commands for each device
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceCommands {
    /// Recorder argv (runs until stopped)
    #[serde(default)]
    pub microphone: Vec<String>,

    /// Front camera still argv
    #[serde(default)]
    pub front_camera: Vec<String>,

    /// Back camera still argv
    #[serde(default)]
    pub back_camera: Vec<String>,
}

/// Build a command from an argv template
fn build_command(argv: &[String], output: &Path) -> Result<Command, DeviceError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| DeviceError::Unavailable("no capture command configured".to_string()))?;

    let output_str = output.to_string_lossy();
    let mut command = Command::new(program);
    command.args(args.iter().map(|a| a.replace(OUTPUT_PLACEHOLDER, &output_str)));
    Ok(command)
}

/// Output path for a new capture
fn capture_path(dir: &Path, prefix: &str, extension: &str) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S_%3f");
    dir.join(format!("{}_{}.{}", prefix, stamp, extension))
}

/// Microphone driven by an external recorder process
pub struct CommandMicrophone {
    argv: Vec<String>,
    capture_dir: PathBuf,
    /// Time the recorder must survive before it counts as active
    startup_grace: Duration,
    stop_timeout: Duration,
}

impl CommandMicrophone {
    pub fn new(argv: Vec<String>, capture_dir: impl Into<PathBuf>) -> Self {
        Self {
            argv,
            capture_dir: capture_dir.into(),
            startup_grace: Duration::from_millis(200),
            stop_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_startup_grace(mut self, grace: Duration) -> Self {
        self.startup_grace = grace;
        self
    }

    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }
}

#[async_trait]
impl Microphone for CommandMicrophone {
    async fn start_recording(&self) -> Result<Box<dyn RecordingHandle>, DeviceError> {
        tokio::fs::create_dir_all(&self.capture_dir).await?;
        let output = capture_path(&self.capture_dir, "audio", "m4a");

        let mut child = build_command(&self.argv, &output)?
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DeviceError::CommandFailed(format!("failed to spawn recorder: {}", e)))?;

        tokio::time::sleep(self.startup_grace).await;
        if let Some(status) = child.try_wait()? {
            return Err(DeviceError::CommandFailed(format!(
                "recorder exited during startup with {}",
                status
            )));
        }

        tracing::debug!(output = %output.display(), "Recorder started");
        Ok(Box::new(CommandRecording {
            child,
            output,
            stop_timeout: self.stop_timeout,
        }))
    }
}

/// Running recorder process
struct CommandRecording {
    child: Child,
    output: PathBuf,
    stop_timeout: Duration,
}

#[async_trait]
impl RecordingHandle for CommandRecording {
    async fn stop(self: Box<Self>) -> Result<PathBuf, DeviceError> {
        let CommandRecording {
            mut child,
            output,
            stop_timeout,
        } = *self;

        if let Some(mut stdin) = child.stdin.take() {
            // The recorder may already have closed stdin; the wait below decides.
            let _ = stdin.write_all(b"q\n").await;
        }

        match timeout(stop_timeout, child.wait()).await {
            Ok(status) => {
                let status = status?;
                if !status.success() {
                    tracing::debug!(%status, "Recorder exited with non-zero status");
                }
            }
            Err(_) => {
                tracing::warn!(?stop_timeout, "Recorder did not exit, killing it");
                child.kill().await?;
            }
        }

        if !tokio::fs::try_exists(&output).await? {
            return Err(DeviceError::MissingOutput(output));
        }
        Ok(output)
    }
}

/// Cameras driven by one external command per still
pub struct CommandCamera {
    commands: DeviceCommands,
    capture_dir: PathBuf,
    capture_timeout: Duration,
}

impl CommandCamera {
    pub fn new(commands: DeviceCommands, capture_dir: impl Into<PathBuf>) -> Self {
        Self {
            commands,
            capture_dir: capture_dir.into(),
            capture_timeout: Duration::from_secs(10),
        }
    }
}

#[async_trait]
impl Camera for CommandCamera {
    async fn take_picture(&self, facing: CameraFacing) -> Result<PathBuf, DeviceError> {
        let argv = match facing {
            CameraFacing::Front => &self.commands.front_camera,
            CameraFacing::Back => &self.commands.back_camera,
        };

        tokio::fs::create_dir_all(&self.capture_dir).await?;
        let output = capture_path(&self.capture_dir, facing.as_str(), "jpg");

        let result = timeout(
            self.capture_timeout,
            build_command(argv, &output)?
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| {
            DeviceError::CommandFailed(format!(
                "{} camera timed out after {:?}",
                facing, self.capture_timeout
            ))
        })?
        .map_err(|e| DeviceError::CommandFailed(format!("failed to run {} camera: {}", facing, e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(DeviceError::CommandFailed(format!(
                "{} camera exited with {}: {}",
                facing,
                result.status,
                stderr.trim()
            )));
        }

        if !tokio::fs::try_exists(&output).await? {
            return Err(DeviceError::MissingOutput(output));
        }
        Ok(output)
    }
}
