use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::settings::{default_data_dir, load_settings, SyncSettings};
use crate::core::content::{identify_all, scan_content_dir, ArtifactId, ContentKind};
use crate::core::downloader::HttpFetcher;
use crate::core::error::LauncherResult;
use crate::core::http::build_http_client;
use crate::core::loaders::{
    self, HttpVersionSource, InstallPlan, LoaderChoice, LoaderKind, LoaderSelector,
    VersionLoaderCache,
};
use crate::core::registry::{
    CurseForgeRegistry, LookupQuery, ModrinthRegistry, Registry, RegistryLookupChain,
};
use crate::core::update::{UpdateAction, UpdatePlanEntry, UpdateReconciler, UpdateSummary};

/// Everything a frontend needs, wired once per data directory.
pub struct AppState {
    pub data_dir: PathBuf,
    pub settings: SyncSettings,
    versions: VersionLoaderCache<HttpVersionSource>,
    registries: RegistryLookupChain<Registry>,
    reconciler: UpdateReconciler<HttpFetcher>,
}

impl AppState {
    pub fn new(data_dir: impl Into<PathBuf>) -> LauncherResult<Self> {
        let data_dir = data_dir.into();
        let settings = load_settings(&data_dir);
        let timeout = settings.request_timeout();
        let client = build_http_client(timeout)?;

        let versions = VersionLoaderCache::new(HttpVersionSource::new(
            client.clone(),
            settings.loader_endpoints.clone(),
            timeout,
        ));

        // Modrinth primero: no necesita clave.
        let registries = RegistryLookupChain::new(vec![
            Registry::Modrinth(ModrinthRegistry::new(
                client.clone(),
                settings.modrinth_api_base.clone(),
                timeout,
            )),
            Registry::CurseForge(CurseForgeRegistry::new(
                client.clone(),
                settings.curseforge_api_base.clone(),
                settings.curseforge_api_key.clone(),
                timeout,
            )),
        ]);

        let reconciler =
            UpdateReconciler::new(HttpFetcher::new(client), settings.max_parallel_downloads);

        info!("Sync core ready, data dir: {:?}", data_dir);
        Ok(Self {
            data_dir,
            settings,
            versions,
            registries,
            reconciler,
        })
    }

    pub fn with_default_dir() -> LauncherResult<Self> {
        Self::new(default_data_dir())
    }

    // ── Loaders ─────────────────────────────────────────

    pub fn offerable_loaders(&self, game_version: &str) -> Vec<LoaderKind> {
        loaders::offerable_loaders(game_version)
    }

    pub fn loader_selector(&self, game_version: &str) -> LoaderSelector {
        LoaderSelector::new(game_version)
    }

    pub async fn load_loader_versions(
        &self,
        kind: LoaderKind,
        game_version: &str,
        token: &CancellationToken,
    ) -> LauncherResult<Vec<String>> {
        self.versions.load_versions(kind, game_version, token).await
    }

    pub fn resolve_install_plan(
        &self,
        game_version: &str,
        choices: &[LoaderChoice],
    ) -> LauncherResult<InstallPlan> {
        Ok(loaders::resolve(game_version, choices)?)
    }

    // ── Content ─────────────────────────────────────────

    /// Bring every file in `dir` up to the newest registry release that
    /// fits `game_version`. Per-file failures end up in the summary.
    pub async fn update_content(
        &self,
        dir: &Path,
        kind: ContentKind,
        game_version: &str,
        loader: Option<LoaderKind>,
        token: &CancellationToken,
    ) -> LauncherResult<UpdateSummary> {
        let policy = self.settings.policy_for(kind);
        let paths = scan_content_dir(dir, &policy).await?;
        info!("Checking {} {} files in {:?}", paths.len(), kind, dir);

        let mut artifacts = Vec::with_capacity(paths.len());
        let mut failed = Vec::new();
        for (path, result) in identify_all(paths, self.settings.max_parallel_downloads).await {
            match result {
                Ok(artifact) => artifacts.push(artifact),
                Err(e) => {
                    warn!("Could not identify {:?}: {}", path, e);
                    failed.push(UpdatePlanEntry::unresolvable(path, None, e.to_string()));
                }
            }
        }

        let query = LookupQuery {
            game_version: game_version.to_string(),
            loaders: policy.loaders_for(loader.map(|l| l.registry_loader())),
            prefer_loaders: policy.apply_loader_preference,
        };
        let matches = self
            .registries
            .batch_lookup(&artifacts, &query, token)
            .await;
        let summary = self
            .reconciler
            .reconcile(&artifacts, &matches, &policy, token)
            .await;

        let mut entries = summary.entries;
        entries.extend(failed);

        if policy.install_dependencies {
            let present: HashSet<_> = matches
                .values()
                .flatten()
                .filter_map(|m| Some((m.registry_id, m.project_id.clone()?)))
                .collect();
            let replaced: Vec<_> = entries
                .iter()
                .filter(|e| e.action == UpdateAction::Replace)
                .filter_map(|e| matches.get(&ArtifactId::from(e.artifact.clone()))?.as_ref())
                .collect();
            let added = self
                .reconciler
                .install_dependencies(&self.registries, &replaced, present, dir, &query, token)
                .await;
            entries.extend(added);
        }

        let summary = UpdateSummary::from_entries(entries);
        info!("{} content in {:?}: {}", kind, dir, summary);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{LauncherError, ValidationError};

    #[tokio::test]
    async fn empty_directory_is_a_quiet_run() {
        let data = tempfile::tempdir().unwrap();
        let state = AppState::new(data.path()).unwrap();
        let mods = data.path().join("mods");

        let summary = state
            .update_content(&mods, ContentKind::Mod, "1.20.1", Some(LoaderKind::Fabric), &CancellationToken::new())
            .await
            .unwrap();

        assert!(summary.entries.is_empty());
        assert_eq!(summary.to_string(), "0 updated, 0 up-to-date, 0 unresolved");
    }

    #[tokio::test]
    async fn liteloader_outside_its_range_needs_no_network() {
        let data = tempfile::tempdir().unwrap();
        let state = AppState::new(data.path()).unwrap();

        let versions = state
            .load_loader_versions(LoaderKind::LiteLoader, "1.20.1", &CancellationToken::new())
            .await
            .unwrap();
        assert!(versions.is_empty());
    }

    #[test]
    fn install_plan_errors_surface_as_validation() {
        let data = tempfile::tempdir().unwrap();
        let state = AppState::new(data.path()).unwrap();

        let err = state
            .resolve_install_plan("1.20.1", &[LoaderChoice::new(LoaderKind::Forge, "")])
            .unwrap_err();
        assert!(matches!(
            err,
            LauncherError::Validation(ValidationError::MissingVersionSelection { kind: LoaderKind::Forge })
        ));
        assert!(state.offerable_loaders("1.20.1").contains(&LoaderKind::Forge));
    }
}
