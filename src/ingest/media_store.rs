//! Persistent media directory for captured artifacts.
//!
//! Device captures land in a scratch directory. Before upload, each file is
//! copied into `<home>/media/<kind>/` under a name derived from its capture
//! time and content hash, so the local history survives scratch cleanup.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::fs;

use crate::domain::UploadKind;

/// Directory of persisted captures
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open the store under the configured home directory
    pub fn open_default() -> anyhow::Result<Self> {
        Ok(Self::new(crate::config::paths::media_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Subdirectory for an artifact kind
    pub fn kind_dir(&self, kind: UploadKind) -> PathBuf {
        let sub = match kind {
            UploadKind::Audio => "audio",
            UploadKind::Photo(facing) => facing.as_str(),
        };
        self.root.join(sub)
    }

    /// Copy a captured file into the store and return the persisted path
    pub async fn persist(
        &self,
        source: &Path,
        kind: UploadKind,
        captured_at: DateTime<Utc>,
    ) -> Result<PathBuf, std::io::Error> {
        let dir = self.kind_dir(kind);
        fs::create_dir_all(&dir).await?;

        let hash = compute_file_hash(source).await?;
        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let name = format!(
            "{}_{}.{}",
            captured_at.format("%Y%m%d_%H%M%S"),
            hash,
            extension
        );
        let target = dir.join(name);

        if !fs::try_exists(&target).await? {
            fs::copy(source, &target).await?;
        }
        Ok(target)
    }
}

/// Compute a short SHA256 hash of a file's content (12 hex chars)
pub async fn compute_file_hash(path: &Path) -> Result<String, std::io::Error> {
    let content = fs::read(path).await?;
    let digest = Sha256::digest(&content);
    Ok(hex::encode(&digest[..6]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CameraFacing;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_persist_copies_into_kind_dir() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("capture.jpg");
        std::fs::write(&source, b"frame").unwrap();

        let store = MediaStore::new(temp.path().join("media"));
        let persisted = store
            .persist(&source, UploadKind::Photo(CameraFacing::Back), Utc::now())
            .await
            .unwrap();

        assert!(persisted.starts_with(temp.path().join("media").join("back")));
        assert_eq!(persisted.extension().unwrap(), "jpg");
        assert_eq!(std::fs::read(&persisted).unwrap(), b"frame");
        // Source is left in place
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_hash_is_stable() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.m4a");
        let b = temp.path().join("b.m4a");
        std::fs::write(&a, b"same").unwrap();
        std::fs::write(&b, b"same").unwrap();

        let hash_a = compute_file_hash(&a).await.unwrap();
        let hash_b = compute_file_hash(&b).await.unwrap();
        assert_eq!(hash_a, hash_b);
        assert_eq!(hash_a.len(), 12);
    }
}
