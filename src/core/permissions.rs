//! Permission gate for capture.
//!
//! Microphone permission is required to start a session. Camera permission
//! is optional: without it a session records audio only. Denials never
//! error out of the gate; they raise a user-visible notice and the
//! dependent operation no-ops.

use std::sync::{Arc, Mutex};

use crate::adapters::{Notifier, PermissionKind, PermissionProvider, PermissionStatus};

/// What the current permissions allow for one capture attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureClearance {
    /// Microphone denied; nothing may be captured
    Denied,

    /// Audio may be recorded; stills only when `cameras` is true
    Allowed { cameras: bool },
}

/// Last observed permission answers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionSnapshot {
    pub microphone: Option<PermissionStatus>,
    pub camera: Option<PermissionStatus>,
}

pub struct PermissionGate {
    provider: Arc<dyn PermissionProvider>,
    notifier: Arc<dyn Notifier>,
    last: Mutex<PermissionSnapshot>,
}

impl PermissionGate {
    pub fn new(provider: Arc<dyn PermissionProvider>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            provider,
            notifier,
            last: Mutex::new(PermissionSnapshot::default()),
        }
    }

    pub async fn request_audio_permission(&self) -> PermissionStatus {
        self.request(PermissionKind::Microphone).await.0
    }

    pub async fn request_camera_permission(&self) -> PermissionStatus {
        self.request(PermissionKind::Camera).await.0
    }

    /// Most recent answers, without querying the provider
    pub fn snapshot(&self) -> PermissionSnapshot {
        self.last.lock().map(|s| *s).unwrap_or_default()
    }

    /// Query the provider; the flag is true when the answer changed
    async fn request(&self, kind: PermissionKind) -> (PermissionStatus, bool) {
        let status = self.provider.request(kind).await;

        let previous = {
            let mut last = match self.last.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let slot = match kind {
                PermissionKind::Microphone => &mut last.microphone,
                PermissionKind::Camera => &mut last.camera,
            };
            slot.replace(status)
        };

        let changed = previous != Some(status);
        if changed {
            match status {
                PermissionStatus::Granted => {
                    tracing::info!(permission = kind.as_str(), "Permission granted")
                }
                PermissionStatus::Denied => {
                    tracing::warn!(permission = kind.as_str(), "Permission denied")
                }
            }
        }
        (status, changed)
    }

    /// Re-check permissions before a capture attempt.
    ///
    /// Notices are raised when a denial is first observed, not on every tick.
    pub async fn check_capture(&self) -> CaptureClearance {
        let (microphone, changed) = self.request(PermissionKind::Microphone).await;
        if !microphone.is_granted() {
            if changed {
                self.notifier.notify(
                    "Permission Required",
                    "Microphone permission is required to record audio.",
                );
            }
            return CaptureClearance::Denied;
        }

        let (camera, changed) = self.request(PermissionKind::Camera).await;
        let cameras = camera.is_granted();
        if !cameras && changed {
            self.notifier.notify(
                "Camera Unavailable",
                "Camera permission not granted; recording audio only.",
            );
        }
        CaptureClearance::Allowed { cameras }
    }
}
