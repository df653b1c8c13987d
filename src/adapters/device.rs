//! Device-facing interfaces.
//!
//! The capture loop never talks to hardware directly. Microphones, cameras
//! and the host permission system sit behind these traits so the loop can
//! run against capture commands, fixtures or test doubles.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::CameraFacing;

/// Device-level capture failures
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Device unavailable: {0}")]
    Unavailable(String),

    #[error("Capture command failed: {0}")]
    CommandFailed(String),

    #[error("Captured file missing: {0}")]
    MissingOutput(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Host permission being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    Microphone,
    Camera,
}

impl PermissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionKind::Microphone => "microphone",
            PermissionKind::Camera => "camera",
        }
    }
}

/// Answer from the host permission system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

/// Source of permission decisions
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Ask the host for a permission (may prompt the user)
    async fn request(&self, kind: PermissionKind) -> PermissionStatus;
}

/// An in-progress audio recording
#[async_trait]
pub trait RecordingHandle: Send {
    /// Stop recording and return the finalized file
    async fn stop(self: Box<Self>) -> Result<PathBuf, DeviceError>;
}

/// Audio input device
#[async_trait]
pub trait Microphone: Send + Sync {
    /// Start a recording; returns once the recorder is confirmed active
    async fn start_recording(&self) -> Result<Box<dyn RecordingHandle>, DeviceError>;
}

/// Still camera device
#[async_trait]
pub trait Camera: Send + Sync {
    /// Capture a single still from the given camera
    async fn take_picture(&self, facing: CameraFacing) -> Result<PathBuf, DeviceError>;
}

/// Surface for user-visible notices (permission denial, manual failures)
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Notifier that writes to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, title: &str, message: &str) {
        eprintln!("[{}] {}", title, message);
    }
}

/// Permission provider answering from configuration
#[derive(Debug, Clone, Copy)]
pub struct StaticPermissions {
    pub microphone: bool,
    pub camera: bool,
}

impl StaticPermissions {
    pub fn granted() -> Self {
        Self {
            microphone: true,
            camera: true,
        }
    }
}

#[async_trait]
impl PermissionProvider for StaticPermissions {
    async fn request(&self, kind: PermissionKind) -> PermissionStatus {
        let granted = match kind {
            PermissionKind::Microphone => self.microphone,
            PermissionKind::Camera => self.camera,
        };
        if granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }
}
