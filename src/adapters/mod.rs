//! Adapter interfaces for external systems.
//!
//! Two seams live here:
//! - [`AnalysisBackend`]: the remote SootheSayer HTTP service
//! - [`device`]: microphone, cameras and host permissions

pub mod backend;
pub mod command;
pub mod device;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::rate_limiter::Rejection;
use crate::domain::{CameraFacing, UploadMetadata};

pub use backend::{BackendClient, Endpoints};
pub use command::{CommandCamera, CommandMicrophone, DeviceCommands};
pub use device::{
    Camera, ConsoleNotifier, DeviceError, Microphone, Notifier, PermissionKind, PermissionProvider,
    PermissionStatus, RecordingHandle, StaticPermissions,
};

/// Errors from a single upload or analysis request
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Rate limited: {0}")]
    RateLimited(Rejection),

    #[error("Failed to read media file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Backend reported failure: {0}")]
    Rejected(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl UploadError {
    /// Short reason recorded on a failed task
    pub fn reason(&self) -> String {
        match self {
            UploadError::RateLimited(_) => "rate_limited".to_string(),
            other => other.to_string(),
        }
    }
}

/// Acknowledgement returned by the upload endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerAck {
    pub success: bool,

    #[serde(default)]
    pub message: Option<String>,

    /// Name the backend stored the file under
    #[serde(default)]
    pub latest_filename: Option<String>,

    /// Transcription of an uploaded clip
    #[serde(default)]
    pub transcription: Option<String>,

    #[serde(default)]
    pub file_size: Option<u64>,
}

/// Result of a single-image sentiment request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentimentResult {
    pub success: bool,

    /// Face sentiment (front camera)
    #[serde(default)]
    pub sentiment: Option<String>,

    /// Scene description (back camera)
    #[serde(default)]
    pub environment: Option<String>,
}

impl SentimentResult {
    /// Whichever field the endpoint filled in
    pub fn text(&self) -> Option<&str> {
        self.sentiment.as_deref().or(self.environment.as_deref())
    }
}

/// Per-modality fields behind a combined analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAnalysis {
    #[serde(default)]
    pub face_sentiment: Option<String>,

    #[serde(default)]
    pub environment_analysis: Option<String>,

    #[serde(default)]
    pub audio_transcription: Option<String>,
}

/// Combined analysis of the latest uploads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombinedAnalysis {
    pub success: bool,

    #[serde(default)]
    pub analysis: String,

    #[serde(default)]
    pub raw_data: Option<RawAnalysis>,
}

/// Remote analysis service
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Upload a recorded audio clip
    async fn upload_audio(
        &self,
        file: &Path,
        metadata: &UploadMetadata,
    ) -> Result<ServerAck, UploadError>;

    /// Upload a camera still
    async fn upload_photo(
        &self,
        file: &Path,
        facing: CameraFacing,
        metadata: &UploadMetadata,
    ) -> Result<ServerAck, UploadError>;

    /// Run face (front) or environment (back) sentiment on one image
    async fn analyze_image(
        &self,
        file: &Path,
        facing: CameraFacing,
    ) -> Result<SentimentResult, UploadError>;

    /// Ask the backend to fuse its most recent uploads
    async fn combined_analysis(&self, request_id: &str) -> Result<CombinedAnalysis, UploadError>;

    /// Liveness probe
    async fn health_check(&self) -> Result<(), UploadError>;
}
