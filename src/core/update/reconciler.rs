use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use futures_util::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::fs::{ArtifactFs, TokioFs};
use super::summary::{UpdatePlanEntry, UpdateSummary};
use super::verify::{validate_file_name, verify_download};
use crate::core::content::{compute_identity, ContentArtifact, ContentPolicy};
use crate::core::downloader::{DownloadProgress, Fetcher};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::registry::{
    CandidateFile, ContentRegistry, DependencyRef, LookupQuery, LookupResult, RegistryId,
    RegistryLookupChain, RegistryMatch,
};

pub const NO_COMPATIBLE_CANDIDATE: &str = "no compatible candidate";

/// Compares installed artifacts with their registry matches and swaps in
/// newer files.
///
/// Each artifact is handled on its own: a failure (download error, lock,
/// bad bytes) leaves that original in place and is reported as
/// `Unresolvable` without touching the rest of the run.
pub struct UpdateReconciler<F, S = TokioFs> {
    fetcher: F,
    fs: S,
    max_parallel: usize,
}

impl<F: Fetcher> UpdateReconciler<F, TokioFs> {
    pub fn new(fetcher: F, max_parallel: usize) -> Self {
        Self::with_fs(fetcher, TokioFs, max_parallel)
    }
}

impl<F: Fetcher, S: ArtifactFs> UpdateReconciler<F, S> {
    pub fn with_fs(fetcher: F, fs: S, max_parallel: usize) -> Self {
        Self {
            fetcher,
            fs,
            max_parallel: max_parallel.max(1),
        }
    }

    pub async fn reconcile(
        &self,
        artifacts: &[ContentArtifact],
        matches: &LookupResult,
        policy: &ContentPolicy,
        token: &CancellationToken,
    ) -> UpdateSummary {
        info!(
            "Reconciling {} artifacts, concurrency={}",
            artifacts.len(),
            self.max_parallel
        );

        let entries: Vec<UpdatePlanEntry> = stream::iter(artifacts)
            .map(|artifact| {
                let found = matches.get(artifact.id()).and_then(Option::as_ref);
                self.reconcile_one(artifact, found, policy, token)
            })
            .buffer_unordered(self.max_parallel)
            .collect()
            .await;

        let summary = UpdateSummary::from_entries(entries);
        info!("Update finished: {}", summary);
        summary
    }

    async fn reconcile_one(
        &self,
        artifact: &ContentArtifact,
        found: Option<&RegistryMatch>,
        policy: &ContentPolicy,
        token: &CancellationToken,
    ) -> UpdatePlanEntry {
        let path = artifact.local_path().to_path_buf();
        let Some(found) = found else {
            return UpdatePlanEntry::unresolvable(path, None, NO_COMPATIBLE_CANDIDATE);
        };

        if found.candidate.identity.matches(artifact.identity()) {
            debug!("{} is up to date ({})", artifact.id(), found.registry_id);
            return UpdatePlanEntry::no_op(path, found.registry_id);
        }

        match self.replace(artifact, found, policy, token).await {
            Ok(new_path) => {
                info!(
                    "Updated {} -> {} from {}",
                    artifact.file_name(),
                    found.candidate.file_name,
                    found.registry_id
                );
                UpdatePlanEntry::replaced(path, found.registry_id, new_path)
            }
            Err(e) => {
                warn!("Could not update {}: {}", artifact.id(), e);
                UpdatePlanEntry::unresolvable(path, Some(found.registry_id), e.to_string())
            }
        }
    }

    async fn replace(
        &self,
        artifact: &ContentArtifact,
        found: &RegistryMatch,
        policy: &ContentPolicy,
        token: &CancellationToken,
    ) -> LauncherResult<PathBuf> {
        let original = artifact.local_path();
        let dir = original.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut displaced: Vec<PathBuf> = vec![original.to_path_buf()];
        let original_name = artifact.file_name();
        for suffix in &policy.sidecar_suffixes {
            let sidecar = original.with_file_name(format!("{original_name}{suffix}"));
            if self.fs.exists(&sidecar).await {
                displaced.push(sidecar);
            }
        }

        self.fetch_into(&found.candidate, &dir, displaced, token).await
    }

    /// Download `candidate` into `dir` under a temporary name, verify it,
    /// then swap it in for `displaced`.
    async fn fetch_into(
        &self,
        candidate: &CandidateFile,
        dir: &Path,
        displaced: Vec<PathBuf>,
        token: &CancellationToken,
    ) -> LauncherResult<PathBuf> {
        let url = candidate
            .url
            .as_deref()
            .ok_or_else(|| LauncherError::Other(format!("{} has no download URL", candidate.file_name)))?;
        validate_file_name(&candidate.file_name)?;

        let target = dir.join(&candidate.file_name);
        let temp = dir.join(format!(
            ".{}.{}.part",
            candidate.file_name,
            Uuid::new_v4().simple()
        ));

        let on_progress = |p: DownloadProgress| {
            trace!("{}: {} / {:?} bytes", p.file_name, p.bytes_downloaded, p.total_bytes);
        };

        let result = async {
            self.fetcher.download(url, &temp, &on_progress, token).await?;
            if token.is_cancelled() {
                return Err(LauncherError::Cancelled);
            }
            verify_download(&temp, candidate).await?;
            self.swap_in(&temp, &target, displaced).await
        }
        .await;

        if result.is_err() && self.fs.exists(&temp).await {
            if let Err(e) = self.fs.remove_file(&temp).await {
                warn!("Could not remove temporary file {:?}: {}", temp, e);
            }
        }
        result.map(|()| target)
    }

    /// Move `displaced` and anything already at `target` aside, put `temp`
    /// in place, then drop the backups. Any failure restores what was moved.
    async fn swap_in(
        &self,
        temp: &Path,
        target: &Path,
        mut displaced: Vec<PathBuf>,
    ) -> LauncherResult<()> {
        if !displaced.iter().any(|p| p == target) && self.fs.exists(target).await {
            displaced.push(target.to_path_buf());
        }

        let mut backups: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(displaced.len());
        for path in displaced {
            let backup = backup_path(&path);
            if let Err(e) = self.fs.rename(&path, &backup).await {
                self.rollback(&backups).await;
                return Err(e);
            }
            backups.push((path, backup));
        }

        if let Err(e) = self.fs.rename(temp, target).await {
            self.rollback(&backups).await;
            return Err(e);
        }

        for (_, backup) in &backups {
            if let Err(e) = self.fs.remove_file(backup).await {
                warn!("Could not remove backup {:?}: {}", backup, e);
            }
        }
        Ok(())
    }

    // ── Dependencies ────────────────────────────────────

    /// Fetch the required dependencies of `replaced` into `dir`, then
    /// theirs, and so on. Projects in `present` are skipped. Failures are
    /// logged and never undo an update.
    pub async fn install_dependencies<R: ContentRegistry>(
        &self,
        registries: &RegistryLookupChain<R>,
        replaced: &[&RegistryMatch],
        mut present: HashSet<(RegistryId, String)>,
        dir: &Path,
        query: &LookupQuery,
        token: &CancellationToken,
    ) -> Vec<UpdatePlanEntry> {
        let mut queue: VecDeque<(RegistryId, DependencyRef)> = replaced
            .iter()
            .flat_map(|m| m.dependencies.iter().map(|d| (m.registry_id, d.clone())))
            .collect();
        let mut visited: HashSet<(RegistryId, String)> = HashSet::new();
        let mut entries = Vec::new();

        while let Some((registry, dependency)) = queue.pop_front() {
            if token.is_cancelled() {
                break;
            }
            let Some(key) = dependency.key().map(str::to_string) else {
                continue;
            };
            if !visited.insert((registry, key.clone())) {
                continue;
            }
            if let Some(project) = &dependency.project_id {
                if present.contains(&(registry, project.clone())) {
                    debug!("Dependency {} already installed", project);
                    continue;
                }
            }

            let found = match registries
                .resolve_dependency(registry, &dependency, query, token)
                .await
            {
                Ok(Some(found)) => found,
                Ok(None) => {
                    warn!("{}: no compatible file for dependency {}", registry, key);
                    continue;
                }
                Err(e) => {
                    warn!("{}: could not resolve dependency {}: {}", registry, key, e);
                    continue;
                }
            };
            if let Some(project) = &found.project_id {
                if !present.insert((registry, project.clone())) {
                    continue;
                }
            }

            match self.fetch_dependency(&found, dir, token).await {
                Ok(Some(path)) => {
                    info!("Added dependency {} from {}", found.candidate.file_name, registry);
                    entries.push(UpdatePlanEntry::dependency(path, registry));
                    queue.extend(found.dependencies.iter().map(|d| (registry, d.clone())));
                }
                Ok(None) => debug!("Dependency {} already on disk", found.candidate.file_name),
                Err(e) => warn!("Could not add dependency {}: {}", found.candidate.file_name, e),
            }
        }

        entries
    }

    /// `Ok(None)` when the exact file already sits in `dir`.
    async fn fetch_dependency(
        &self,
        found: &RegistryMatch,
        dir: &Path,
        token: &CancellationToken,
    ) -> LauncherResult<Option<PathBuf>> {
        validate_file_name(&found.candidate.file_name)?;
        let target = dir.join(&found.candidate.file_name);
        if self.fs.exists(&target).await {
            let identity = compute_identity(&target).await?;
            if found.candidate.identity.matches(&identity) {
                return Ok(None);
            }
        }
        self.fetch_into(&found.candidate, dir, Vec::new(), token)
            .await
            .map(Some)
    }

    async fn rollback(&self, backups: &[(PathBuf, PathBuf)]) {
        for (original, backup) in backups.iter().rev() {
            if let Err(e) = self.fs.rename(backup, original).await {
                warn!("Could not restore {:?} from {:?}: {}", original, backup, e);
            }
        }
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.bak", name, Uuid::new_v4().simple()))
}
