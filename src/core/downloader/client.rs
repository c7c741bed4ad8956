use std::path::Path;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

/// Progress reported while a file streams to disk.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DownloadProgress {
    pub url: String,
    pub bytes_downloaded: u64,
    pub total_bytes: Option<u64>,
    pub file_name: String,
}

/// Moves the bytes behind `url` into `dest`.
///
/// On error or cancellation `dest` may hold a partial file; callers that
/// download to a temporary path are expected to discard it.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: &(dyn Fn(DownloadProgress) + Send + Sync),
        token: &CancellationToken,
    ) -> LauncherResult<()>;
}

/// Streaming HTTP downloader.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn stream_to_file(
        &self,
        url: &str,
        dest: &Path,
        on_progress: &(dyn Fn(DownloadProgress) + Send + Sync),
        token: &CancellationToken,
    ) -> LauncherResult<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::from_io(parent, e))?;
        }

        let response = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(LauncherError::Cancelled),
            r = self.client.get(url).send() => r?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total_bytes = response.content_length();
        let file_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        // El handle se suelta al salir del bloque; en Windows es crítico
        // antes de renombrar.
        {
            let mut file = tokio::fs::File::create(dest)
                .await
                .map_err(|e| LauncherError::from_io(dest, e))?;
            let mut stream = response.bytes_stream();
            let mut bytes_downloaded = 0u64;

            loop {
                let next = tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(LauncherError::Cancelled),
                    chunk = stream.next() => chunk,
                };
                let Some(chunk) = next else {
                    break;
                };
                let chunk = chunk?;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| LauncherError::from_io(dest, e))?;
                bytes_downloaded += chunk.len() as u64;
                on_progress(DownloadProgress {
                    url: url.to_string(),
                    bytes_downloaded,
                    total_bytes,
                    file_name: file_name.clone(),
                });
            }

            file.flush()
                .await
                .map_err(|e| LauncherError::from_io(dest, e))?;
        }

        debug!("Downloaded: {} -> {:?}", url, dest);
        Ok(())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: &(dyn Fn(DownloadProgress) + Send + Sync),
        token: &CancellationToken,
    ) -> LauncherResult<()> {
        let result = self.stream_to_file(url, dest, on_progress, token).await;
        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(dest).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Could not remove partial download {:?}: {}", dest, e);
                }
            }
        }
        result
    }
}
