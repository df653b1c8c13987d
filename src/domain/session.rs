//! Capture session state.
//!
//! A CaptureSession represents one bounded recording + photo-capture episode.
//! Lifecycle: Idle → Recording → Finalizing → {Completed, Failed}.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::upload::{CameraFacing, UploadTask};

/// Errors raised by invalid session transitions
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Invalid session transition: {from:?} → {to:?}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },
}

/// Lifecycle status of a capture session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum SessionStatus {
    Idle,
    Recording,
    Finalizing,
    Completed,
    Failed { reason: String },
}

impl SessionStatus {
    /// Recording or Finalizing: the session holds the device
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Recording | SessionStatus::Finalizing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Recording => "recording",
            SessionStatus::Finalizing => "finalizing",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed { .. } => "failed",
        }
    }
}

/// One recording + photo-capture episode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSession {
    pub id: Uuid,

    pub started_at: DateTime<Utc>,

    pub status: SessionStatus,

    /// Finalized audio file (set in Finalizing)
    pub audio: Option<PathBuf>,

    /// Most recent front camera still
    pub front_photo: Option<PathBuf>,

    /// Most recent back camera still
    pub back_photo: Option<PathBuf>,

    /// Upload tasks produced so far, in dispatch order
    pub tasks: Vec<UploadTask>,

    /// When the session reached a terminal state
    pub finished_at: Option<DateTime<Utc>>,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSession {
    /// Create a new idle session
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            started_at: Utc::now(),
            status: SessionStatus::Idle,
            audio: None,
            front_photo: None,
            back_photo: None,
            tasks: Vec::new(),
            finished_at: None,
        }
    }

    /// Idle → Recording
    pub fn begin_recording(&mut self) -> Result<(), SessionError> {
        self.transition(SessionStatus::Recording)
    }

    /// Recording → Finalizing
    pub fn begin_finalizing(&mut self) -> Result<(), SessionError> {
        self.transition(SessionStatus::Finalizing)
    }

    /// Finalizing → Completed
    pub fn complete(&mut self) -> Result<(), SessionError> {
        self.transition(SessionStatus::Completed)
    }

    /// Idle | Finalizing → Failed
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), SessionError> {
        self.transition(SessionStatus::Failed {
            reason: reason.into(),
        })
    }

    fn transition(&mut self, to: SessionStatus) -> Result<(), SessionError> {
        let allowed = matches!(
            (&self.status, &to),
            (SessionStatus::Idle, SessionStatus::Recording)
                | (SessionStatus::Idle, SessionStatus::Failed { .. })
                | (SessionStatus::Recording, SessionStatus::Finalizing)
                | (SessionStatus::Finalizing, SessionStatus::Completed)
                | (SessionStatus::Finalizing, SessionStatus::Failed { .. })
        );

        if !allowed {
            return Err(SessionError::InvalidTransition {
                from: self.status.clone(),
                to,
            });
        }

        if to.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        self.status = to;
        Ok(())
    }

    /// Remember the latest still for a camera
    pub fn record_photo(&mut self, facing: CameraFacing, path: PathBuf) {
        match facing {
            CameraFacing::Front => self.front_photo = Some(path),
            CameraFacing::Back => self.back_photo = Some(path),
        }
    }

    /// Number of tasks that ended in failure
    pub fn failed_task_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_failed()).count()
    }

    /// True when every produced task has resolved
    pub fn all_tasks_resolved(&self) -> bool {
        self.tasks.iter().all(|t| t.result.is_terminal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut session = CaptureSession::new();
        assert_eq!(session.status, SessionStatus::Idle);

        session.begin_recording().unwrap();
        assert!(session.status.is_active());

        session.begin_finalizing().unwrap();
        assert!(session.status.is_active());

        session.complete().unwrap();
        assert!(session.status.is_terminal());
        assert!(session.finished_at.is_some());
    }

    #[test]
    fn test_finalizing_can_fail() {
        let mut session = CaptureSession::new();
        session.begin_recording().unwrap();
        session.begin_finalizing().unwrap();
        session.fail("microphone stop failed").unwrap();

        assert_eq!(
            session.status,
            SessionStatus::Failed {
                reason: "microphone stop failed".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut session = CaptureSession::new();

        // Cannot skip Recording
        let err = session.begin_finalizing().unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition {
                from: SessionStatus::Idle,
                to: SessionStatus::Finalizing,
            }
        );

        // Recording cannot fail directly; it must finalize first
        session.begin_recording().unwrap();
        assert!(session.fail("nope").is_err());
        assert!(session.complete().is_err());

        // Terminal states are final
        session.begin_finalizing().unwrap();
        session.complete().unwrap();
        assert!(session.begin_recording().is_err());
        assert!(session.fail("late").is_err());
    }

    #[test]
    fn test_record_photo_keeps_latest() {
        let mut session = CaptureSession::new();
        session.record_photo(CameraFacing::Front, PathBuf::from("one.jpg"));
        session.record_photo(CameraFacing::Front, PathBuf::from("two.jpg"));

        assert_eq!(session.front_photo, Some(PathBuf::from("two.jpg")));
        assert!(session.back_photo.is_none());
    }
}
