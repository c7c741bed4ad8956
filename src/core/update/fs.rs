use std::path::Path;

use async_trait::async_trait;

use crate::core::error::{LauncherError, LauncherResult};

/// The file operations a replacement needs. Errors on files held by
/// another process surface as [`LauncherError::LockedFile`].
#[async_trait]
pub trait ArtifactFs: Send + Sync {
    async fn rename(&self, from: &Path, to: &Path) -> LauncherResult<()>;
    async fn remove_file(&self, path: &Path) -> LauncherResult<()>;
    async fn exists(&self, path: &Path) -> bool;
}

pub struct TokioFs;

#[async_trait]
impl ArtifactFs for TokioFs {
    async fn rename(&self, from: &Path, to: &Path) -> LauncherResult<()> {
        tokio::fs::rename(from, to)
            .await
            .map_err(|e| LauncherError::from_io(from, e))
    }

    async fn remove_file(&self, path: &Path) -> LauncherResult<()> {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| LauncherError::from_io(path, e))
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}
