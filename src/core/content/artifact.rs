use std::fmt;
use std::path::{Path, PathBuf};

use futures_util::stream::{self, StreamExt};
use tracing::debug;

use super::identity::{compute_identity, ContentIdentity};
use super::kind::ContentPolicy;
use crate::core::error::{LauncherError, LauncherResult};

/// Stable key for an artifact within one run: its local path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactId(PathBuf);

impl ArtifactId {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl From<PathBuf> for ArtifactId {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// An installed file plus the identity computed for it in this run.
///
/// There is no way to change the identity after construction; a new run
/// builds new artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentArtifact {
    id: ArtifactId,
    identity: ContentIdentity,
}

impl ContentArtifact {
    pub fn new(local_path: impl Into<PathBuf>, identity: ContentIdentity) -> Self {
        Self {
            id: ArtifactId(local_path.into()),
            identity,
        }
    }

    pub fn id(&self) -> &ArtifactId {
        &self.id
    }

    pub fn local_path(&self) -> &Path {
        self.id.path()
    }

    pub fn identity(&self) -> &ContentIdentity {
        &self.identity
    }

    pub fn file_name(&self) -> String {
        self.local_path()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Files in `dir` that the policy covers, sorted by path.
///
/// Hidden files (which includes our own in-flight downloads) and leftovers
/// with a `.part`/`.tmp`/`.bak` extension are skipped.
pub async fn scan_content_dir(dir: &Path, policy: &ContentPolicy) -> LauncherResult<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(LauncherError::from_io(dir, e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| LauncherError::from_io(dir, e))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| LauncherError::from_io(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }

        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if matches!(ext, "part" | "tmp" | "bak") || !policy.accepts_extension(ext) {
            continue;
        }
        files.push(path);
    }

    files.sort();
    debug!("Scanned {:?}: {} candidate files", dir, files.len());
    Ok(files)
}

/// Compute identities concurrently, keeping input order.
pub async fn identify_all(
    paths: Vec<PathBuf>,
    parallelism: usize,
) -> Vec<(PathBuf, LauncherResult<ContentArtifact>)> {
    stream::iter(paths)
        .map(|path| async move {
            let result = compute_identity(&path)
                .await
                .map(|identity| ContentArtifact::new(path.clone(), identity));
            (path, result)
        })
        .buffered(parallelism.max(1))
        .collect()
        .await
}
