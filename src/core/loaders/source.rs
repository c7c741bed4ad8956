use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::kind::LoaderKind;
use super::{fabric, forge, liteloader, optifine};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::{CLEANROOM_MAVEN, FORGE_MAVEN, NEOFORGE_MAVEN};

/// Upstream that can enumerate the versions of a loader for a game version.
///
/// Implementations return [`LauncherError::NotFound`] when the upstream has
/// no entry for the pair; the cache turns that into an empty list.
#[async_trait]
pub trait VersionSource: Send + Sync {
    async fn list_versions(&self, kind: LoaderKind, game_version: &str)
        -> LauncherResult<Vec<String>>;
}

/// Base URLs per loader family. Mirrors can be configured here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoaderEndpoints {
    pub fabric_meta: String,
    pub quilt_meta: String,
    pub legacy_fabric_meta: String,
    pub forge_maven: String,
    pub neoforge_maven: String,
    pub cleanroom_maven: String,
    pub bmclapi: String,
    pub liteloader_versions: String,
}

impl Default for LoaderEndpoints {
    fn default() -> Self {
        Self {
            fabric_meta: "https://meta.fabricmc.net/v2".into(),
            quilt_meta: "https://meta.quiltmc.org/v3".into(),
            legacy_fabric_meta: "https://meta.legacyfabric.net/v2".into(),
            forge_maven: FORGE_MAVEN.into(),
            neoforge_maven: NEOFORGE_MAVEN.into(),
            cleanroom_maven: CLEANROOM_MAVEN.into(),
            bmclapi: "https://bmclapi2.bangbang93.com".into(),
            liteloader_versions: "http://dl.liteloader.com/versions/versions.json".into(),
        }
    }
}

/// Talks to the public meta services and Maven repositories.
pub struct HttpVersionSource {
    client: reqwest::Client,
    endpoints: LoaderEndpoints,
    timeout: Duration,
}

impl HttpVersionSource {
    pub fn new(client: reqwest::Client, endpoints: LoaderEndpoints, timeout: Duration) -> Self {
        Self {
            client,
            endpoints,
            timeout,
        }
    }
}

#[async_trait]
impl VersionSource for HttpVersionSource {
    async fn list_versions(
        &self,
        kind: LoaderKind,
        game_version: &str,
    ) -> LauncherResult<Vec<String>> {
        let fetch = Fetch {
            client: &self.client,
            timeout: self.timeout,
        };
        let e = &self.endpoints;

        let versions = match kind {
            LoaderKind::Fabric => fabric::list_versions(&fetch, &e.fabric_meta, game_version).await?,
            LoaderKind::Quilt => fabric::list_versions(&fetch, &e.quilt_meta, game_version).await?,
            LoaderKind::LegacyFabric => {
                fabric::list_versions(&fetch, &e.legacy_fabric_meta, game_version).await?
            }
            LoaderKind::Forge => forge::list_forge(&fetch, &e.forge_maven, game_version).await?,
            LoaderKind::NeoForge => {
                forge::list_neoforge(&fetch, &e.neoforge_maven, game_version).await?
            }
            LoaderKind::Cleanroom => {
                forge::list_cleanroom(&fetch, &e.cleanroom_maven, game_version).await?
            }
            LoaderKind::OptiFine => optifine::list_versions(&fetch, &e.bmclapi, game_version).await?,
            LoaderKind::LiteLoader => {
                liteloader::list_versions(&fetch, &e.liteloader_versions, game_version).await?
            }
        };

        debug!("{} versions for {}: {}", kind, game_version, versions.len());
        Ok(versions)
    }
}

/// Borrowed client + timeout handed to the per-family listing functions.
pub(crate) struct Fetch<'a> {
    pub client: &'a reqwest::Client,
    pub timeout: Duration,
}

impl Fetch<'_> {
    /// GET `url`, mapping 404 to `NotFound` and other failures to `LoaderApi`.
    pub async fn get(&self, url: &str) -> LauncherResult<reqwest::Response> {
        let response = self.client.get(url).timeout(self.timeout).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LauncherError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(LauncherError::LoaderApi(format!("{url} returned {status}")));
        }
        Ok(response)
    }

    pub async fn get_text(&self, url: &str) -> LauncherResult<String> {
        Ok(self.get(url).await?.text().await?)
    }
}
