//! Upload tasks produced by a capture session.
//!
//! One task exists per captured artifact. A task is terminal once its HTTP
//! call resolves or fails; tasks are never retried.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which physical camera produced a still
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraFacing {
    /// Selfie camera, used for face sentiment
    Front,

    /// Rear camera, used for environment sentiment
    Back,
}

impl CameraFacing {
    /// Value sent in the `camera_type` form field
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraFacing::Front => "front",
            CameraFacing::Back => "back",
        }
    }

    /// Analysis the backend runs on stills from this camera
    pub fn analysis_type(&self) -> AnalysisType {
        match self {
            CameraFacing::Front => AnalysisType::FaceSentiment,
            CameraFacing::Back => AnalysisType::EnvironmentSentiment,
        }
    }
}

impl fmt::Display for CameraFacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of captured artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "camera")]
pub enum UploadKind {
    Audio,
    Photo(CameraFacing),
}

impl UploadKind {
    /// Short label used in logs and the session journal
    pub fn label(&self) -> &'static str {
        match self {
            UploadKind::Audio => "audio",
            UploadKind::Photo(CameraFacing::Front) => "photo:front",
            UploadKind::Photo(CameraFacing::Back) => "photo:back",
        }
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Analysis the backend should run on an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Transcription,
    FaceSentiment,
    EnvironmentSentiment,
}

impl AnalysisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::Transcription => "transcription",
            AnalysisType::FaceSentiment => "face_sentiment",
            AnalysisType::EnvironmentSentiment => "environment_sentiment",
        }
    }
}

/// Metadata sent alongside the file as multipart text fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadMetadata {
    /// Capture time
    pub timestamp: DateTime<Utc>,

    /// Requested analysis
    pub analysis_type: AnalysisType,

    /// Recording length in milliseconds (audio only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Outcome of an upload attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum TaskResult {
    Pending,
    Succeeded,
    Failed(String),
}

impl TaskResult {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskResult::Pending)
    }
}

/// A single captured artifact waiting to be (or already) uploaded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadTask {
    pub kind: UploadKind,

    /// Local file holding the captured media
    pub file: PathBuf,

    pub metadata: UploadMetadata,

    pub result: TaskResult,
}

impl UploadTask {
    /// Create a pending audio task
    pub fn audio(file: PathBuf, captured_at: DateTime<Utc>, duration_ms: u64) -> Self {
        Self {
            kind: UploadKind::Audio,
            file,
            metadata: UploadMetadata {
                timestamp: captured_at,
                analysis_type: AnalysisType::Transcription,
                duration_ms: Some(duration_ms),
            },
            result: TaskResult::Pending,
        }
    }

    /// Create a pending photo task for the given camera
    pub fn photo(facing: CameraFacing, file: PathBuf, captured_at: DateTime<Utc>) -> Self {
        Self {
            kind: UploadKind::Photo(facing),
            file,
            metadata: UploadMetadata {
                timestamp: captured_at,
                analysis_type: facing.analysis_type(),
                duration_ms: None,
            },
            result: TaskResult::Pending,
        }
    }

    pub fn mark_succeeded(&mut self) {
        self.result = TaskResult::Succeeded;
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.result = TaskResult::Failed(reason.into());
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.result, TaskResult::Failed(_))
    }
}
