//! HTTP client for the SootheSayer analysis backend.
//!
//! Every endpoint answers JSON with a `success` flag; failures carry an
//! `error` message. Media is sent as multipart form data.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{
    AnalysisBackend, CombinedAnalysis, SentimentResult, ServerAck, UploadError,
};
use crate::domain::{CameraFacing, UploadMetadata};

/// Endpoint paths relative to the base URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    pub audio_upload: String,
    pub photo_upload: String,
    pub face_sentiment: String,
    pub environment_sentiment: String,
    pub combined_sentiment: String,
    pub health: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            audio_upload: "/api/audio/upload".to_string(),
            photo_upload: "/api/photo/upload".to_string(),
            face_sentiment: "/api/analyze/face-sentiment".to_string(),
            environment_sentiment: "/api/analyze/environment-sentiment".to_string(),
            combined_sentiment: "/api/analyze/combined-sentiment".to_string(),
            health: "/api/health".to_string(),
        }
    }
}

/// Body for the combined analysis request
#[derive(Debug, Serialize)]
struct CombinedRequest<'a> {
    use_latest_files: bool,
    request_id: &'a str,
}

/// Fields every response may carry
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Backend HTTP client
pub struct BackendClient {
    base_url: String,
    endpoints: Endpoints,
    client: reqwest::Client,
}

impl BackendClient {
    /// Create a client with a per-request timeout
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            endpoints: Endpoints::default(),
            client,
        })
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL for an endpoint path
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Multipart file part with a content type
    async fn file_part(file: &Path, file_name: String, mime: &str) -> Result<Part, UploadError> {
        let bytes = tokio::fs::read(file).await?;
        Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(UploadError::Network)
    }

    async fn post_form<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T, UploadError> {
        let response = self.client.post(self.url(path)).multipart(form).send().await?;
        decode(response).await
    }
}

/// Turn an HTTP response into a typed body, mapping failures to [`UploadError`]
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, UploadError> {
    let status = response.status();
    let body = response.text().await?;
    let value: Option<serde_json::Value> = serde_json::from_str(&body).ok();
    let envelope: Envelope = value
        .as_ref()
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    if !status.is_success() {
        let message = envelope
            .error
            .or(envelope.message)
            .unwrap_or_else(|| body.trim().to_string());
        return Err(UploadError::Server {
            status: status.as_u16(),
            message,
        });
    }

    let value = value.ok_or_else(|| {
        UploadError::InvalidResponse(format!("expected JSON body, got: {}", body.trim()))
    })?;

    if envelope.success == Some(false) {
        return Err(UploadError::Rejected(
            envelope
                .error
                .or(envelope.message)
                .unwrap_or_else(|| "success=false".to_string()),
        ));
    }

    serde_json::from_value(value).map_err(|e| UploadError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl AnalysisBackend for BackendClient {
    async fn upload_audio(
        &self,
        file: &Path,
        metadata: &UploadMetadata,
    ) -> Result<ServerAck, UploadError> {
        let request_id = metadata.timestamp.timestamp_millis();
        let part = Self::file_part(file, format!("upload_{}.m4a", request_id), "audio/m4a").await?;

        let mut form = Form::new()
            .part("audio", part)
            .text("timestamp", request_id.to_string())
            .text("analysis_type", metadata.analysis_type.as_str());
        if let Some(duration_ms) = metadata.duration_ms {
            form = form.text("duration", (duration_ms / 1000).to_string());
        }

        tracing::info!(request_id, file = %file.display(), "Uploading audio");
        let ack: ServerAck = self.post_form(&self.endpoints.audio_upload, form).await?;
        tracing::info!(
            request_id,
            filename = ack.latest_filename.as_deref().unwrap_or("-"),
            file_size = ack.file_size.unwrap_or(0),
            "Audio uploaded"
        );
        Ok(ack)
    }

    async fn upload_photo(
        &self,
        file: &Path,
        facing: CameraFacing,
        metadata: &UploadMetadata,
    ) -> Result<ServerAck, UploadError> {
        let request_id = metadata.timestamp.timestamp_millis();
        let part = Self::file_part(
            file,
            format!("{}_camera_{}.jpg", facing, request_id),
            "image/jpeg",
        )
        .await?;

        let form = Form::new()
            .part("photo", part)
            .text("camera_type", facing.as_str())
            .text("timestamp", metadata.timestamp.to_rfc3339())
            .text("analysis_type", metadata.analysis_type.as_str());

        tracing::info!(request_id, camera = %facing, "Uploading photo");
        let ack = self.post_form(&self.endpoints.photo_upload, form).await?;
        tracing::info!(request_id, camera = %facing, "Photo uploaded");
        Ok(ack)
    }

    async fn analyze_image(
        &self,
        file: &Path,
        facing: CameraFacing,
    ) -> Result<SentimentResult, UploadError> {
        let path = match facing {
            CameraFacing::Front => &self.endpoints.face_sentiment,
            CameraFacing::Back => &self.endpoints.environment_sentiment,
        };
        let part = Self::file_part(file, format!("{}_camera.jpg", facing), "image/jpeg").await?;
        let form = Form::new().part("image", part);

        tracing::info!(camera = %facing, "Requesting image sentiment");
        self.post_form(path, form).await
    }

    async fn combined_analysis(&self, request_id: &str) -> Result<CombinedAnalysis, UploadError> {
        tracing::info!(request_id, "Requesting combined analysis");
        let response = self
            .client
            .post(self.url(&self.endpoints.combined_sentiment))
            .json(&CombinedRequest {
                use_latest_files: true,
                request_id,
            })
            .send()
            .await?;
        decode(response).await
    }

    async fn health_check(&self) -> Result<(), UploadError> {
        let response = self.client.get(self.url(&self.endpoints.health)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(UploadError::Server {
                status: status.as_u16(),
                message: text,
            });
        }
        Ok(())
    }
}

/// Request id for ad-hoc calls (ms since epoch, as the app used)
pub fn new_request_id() -> String {
    Utc::now().timestamp_millis().to_string()
}
