//! Session journal events.
//!
//! Every capture session records its lifecycle as immutable events in an
//! append-only JSONL journal. Summaries are rebuilt by replaying them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::upload::{TaskResult, UploadKind};

/// A single entry in the session journal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Unique identifier for this event
    pub id: Uuid,

    /// When this event occurred (ISO 8601)
    pub timestamp: DateTime<Utc>,

    /// The session this event belongs to
    pub session_id: Uuid,

    pub event_type: SessionEventType,

    /// Human-readable summary (no media content)
    pub summary: String,

    /// Artifact kind for task events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_kind: Option<UploadKind>,

    /// Task outcome for task events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_result: Option<TaskResult>,

    /// Session length in milliseconds (terminal events)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Error message if failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionEvent {
    /// Create a new event with the current timestamp
    pub fn new(session_id: Uuid, event_type: SessionEventType, summary: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            session_id,
            event_type,
            summary: summary.into(),
            upload_kind: None,
            task_result: None,
            duration_ms: None,
            error: None,
        }
    }

    /// Attach an upload task outcome
    pub fn with_task(mut self, kind: UploadKind, result: TaskResult) -> Self {
        self.upload_kind = Some(kind);
        self.task_result = Some(result);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Types of journal events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventType {
    /// Recording started
    SessionStarted,

    /// An upload task reached a terminal state
    TaskResolved,

    /// Session finished with all uploads attempted
    SessionCompleted,

    /// Session aborted on a device failure
    SessionFailed,

    /// Combined analysis returned by the backend
    AnalysisReceived,
}
