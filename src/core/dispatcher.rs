//! Upload dispatcher.
//!
//! Gates each upload task through the shared rate limiter and, when
//! admitted, sends it to the backend endpoint selected by the task kind.
//! Failures are logged and recorded on the task; they are never retried and
//! never escalate past the caller.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::adapters::{AnalysisBackend, ServerAck, UploadError};
use crate::domain::{UploadKind, UploadTask};

use super::rate_limiter::{Admission, RateLimiter, RateLimiterState};

pub struct UploadDispatcher {
    backend: Arc<dyn AnalysisBackend>,
    limiter: Mutex<RateLimiter>,
}

impl UploadDispatcher {
    pub fn new(backend: Arc<dyn AnalysisBackend>, limiter: RateLimiter) -> Self {
        Self {
            backend,
            limiter: Mutex::new(limiter),
        }
    }

    pub fn backend(&self) -> &Arc<dyn AnalysisBackend> {
        &self.backend
    }

    /// Current limiter counters
    pub async fn limiter_state(&self) -> RateLimiterState {
        self.limiter.lock().await.state()
    }

    /// Upload one task, recording the outcome on it.
    ///
    /// A rate-limited task is marked failed without any network call.
    #[instrument(skip(self, task), fields(kind = %task.kind))]
    pub async fn upload(&self, task: &mut UploadTask) -> Result<ServerAck, UploadError> {
        let admission = self.limiter.lock().await.try_acquire();
        if let Admission::Rejected(reason) = admission {
            let err = UploadError::RateLimited(reason);
            info!(%reason, "Upload skipped");
            task.mark_failed(err.reason());
            return Err(err);
        }

        let result = match task.kind {
            UploadKind::Audio => self.backend.upload_audio(&task.file, &task.metadata).await,
            UploadKind::Photo(facing) => {
                self.backend
                    .upload_photo(&task.file, facing, &task.metadata)
                    .await
            }
        };

        match &result {
            Ok(_) => {
                info!(file = %task.file.display(), "Upload succeeded");
                task.mark_succeeded();
            }
            Err(e) => {
                warn!(error = %e, "Upload failed");
                task.mark_failed(e.reason());
            }
        }
        result
    }
}
