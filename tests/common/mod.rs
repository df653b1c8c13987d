//! Shared test doubles for devices and the analysis backend.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use soothsayer::adapters::{
    AnalysisBackend, Camera, CombinedAnalysis, DeviceError, Microphone, Notifier,
    RecordingHandle, SentimentResult, ServerAck, UploadError,
};
use soothsayer::domain::{CameraFacing, UploadMetadata};

/// Backend that records every call and answers from a per-endpoint script
#[derive(Default)]
pub struct MockBackend {
    calls: Mutex<Vec<String>>,
    /// Endpoint label -> HTTP status to fail with
    failures: Mutex<HashMap<&'static str, u16>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make calls to `label` ("audio", "photo:front", "photo:back",
    /// "combined") fail with the given status
    pub fn fail(&self, label: &'static str, status: u16) {
        self.failures.lock().unwrap().insert(label, status);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, label: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == label).count()
    }

    fn answer(&self, label: &'static str) -> Result<(), UploadError> {
        self.calls.lock().unwrap().push(label.to_string());
        match self.failures.lock().unwrap().get(label) {
            Some(status) => Err(UploadError::Server {
                status: *status,
                message: "Internal server error".to_string(),
            }),
            None => Ok(()),
        }
    }
}

fn photo_label(facing: CameraFacing) -> &'static str {
    match facing {
        CameraFacing::Front => "photo:front",
        CameraFacing::Back => "photo:back",
    }
}

#[async_trait]
impl AnalysisBackend for MockBackend {
    async fn upload_audio(
        &self,
        file: &Path,
        _metadata: &UploadMetadata,
    ) -> Result<ServerAck, UploadError> {
        self.answer("audio")?;
        Ok(ServerAck {
            success: true,
            latest_filename: file.file_name().map(|n| n.to_string_lossy().to_string()),
            transcription: Some("hello there".to_string()),
            ..Default::default()
        })
    }

    async fn upload_photo(
        &self,
        _file: &Path,
        facing: CameraFacing,
        _metadata: &UploadMetadata,
    ) -> Result<ServerAck, UploadError> {
        self.answer(photo_label(facing))?;
        Ok(ServerAck {
            success: true,
            ..Default::default()
        })
    }

    async fn analyze_image(
        &self,
        _file: &Path,
        facing: CameraFacing,
    ) -> Result<SentimentResult, UploadError> {
        self.answer(match facing {
            CameraFacing::Front => "sentiment:front",
            CameraFacing::Back => "sentiment:back",
        })?;
        Ok(SentimentResult {
            success: true,
            sentiment: Some("calm".to_string()),
            environment: None,
        })
    }

    async fn combined_analysis(&self, _request_id: &str) -> Result<CombinedAnalysis, UploadError> {
        self.answer("combined")?;
        Ok(CombinedAnalysis {
            success: true,
            analysis: "You seem relaxed.".to_string(),
            raw_data: None,
        })
    }

    async fn health_check(&self) -> Result<(), UploadError> {
        self.answer("health")
    }
}

/// How a mock device should behave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Behavior {
    #[default]
    Works,
    Fails,
    Hangs,
}

/// Microphone that writes a small file on stop and tracks overlap
pub struct MockMicrophone {
    dir: PathBuf,
    pub start: Behavior,
    pub stop: Behavior,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    started: AtomicUsize,
}

impl MockMicrophone {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            start: Behavior::Works,
            stop: Behavior::Works,
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
            started: AtomicUsize::new(0),
        }
    }

    pub fn with_start(mut self, behavior: Behavior) -> Self {
        self.start = behavior;
        self
    }

    pub fn with_stop(mut self, behavior: Behavior) -> Self {
        self.stop = behavior;
        self
    }

    /// Most recordings ever open at once
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

struct MockRecording {
    path: PathBuf,
    stop: Behavior,
    active: Arc<AtomicUsize>,
}

#[async_trait]
impl Microphone for MockMicrophone {
    async fn start_recording(&self) -> Result<Box<dyn RecordingHandle>, DeviceError> {
        match self.start {
            Behavior::Works => {}
            Behavior::Fails => {
                return Err(DeviceError::Unavailable("no input device".to_string()))
            }
            Behavior::Hangs => std::future::pending::<()>().await,
        }

        let n = self.started.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        Ok(Box::new(MockRecording {
            path: self.dir.join(format!("recording_{}.m4a", n)),
            stop: self.stop,
            active: self.active.clone(),
        }))
    }
}

#[async_trait]
impl RecordingHandle for MockRecording {
    async fn stop(self: Box<Self>) -> Result<PathBuf, DeviceError> {
        self.active.fetch_sub(1, Ordering::SeqCst);
        match self.stop {
            Behavior::Works => {}
            Behavior::Fails => {
                return Err(DeviceError::CommandFailed("recorder crashed".to_string()))
            }
            Behavior::Hangs => std::future::pending::<()>().await,
        }
        std::fs::write(&self.path, b"audio")?;
        Ok(self.path)
    }
}

/// Camera that writes one file per still
pub struct MockCamera {
    dir: PathBuf,
    behavior: Mutex<HashMap<CameraFacing, Behavior>>,
    taken: AtomicUsize,
}

impl MockCamera {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            behavior: Mutex::new(HashMap::new()),
            taken: AtomicUsize::new(0),
        }
    }

    pub fn with(self, facing: CameraFacing, behavior: Behavior) -> Self {
        self.behavior.lock().unwrap().insert(facing, behavior);
        self
    }

    pub fn taken(&self) -> usize {
        self.taken.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Camera for MockCamera {
    async fn take_picture(&self, facing: CameraFacing) -> Result<PathBuf, DeviceError> {
        let behavior = self
            .behavior
            .lock()
            .unwrap()
            .get(&facing)
            .copied()
            .unwrap_or_default();
        match behavior {
            Behavior::Works => {}
            Behavior::Fails => {
                return Err(DeviceError::CommandFailed(format!("{} camera busy", facing)))
            }
            Behavior::Hangs => std::future::pending::<()>().await,
        }

        let n = self.taken.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(format!("{}_{}.jpg", facing, n));
        std::fs::write(&path, format!("{} frame {}", facing, n))?;
        Ok(path)
    }
}

/// Notifier that keeps every notice
#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.notices.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, _message: &str) {
        self.notices.lock().unwrap().push(title.to_string());
    }
}

pub fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

pub fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}
