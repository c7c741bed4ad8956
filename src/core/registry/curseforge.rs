use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::chain::newest_compatible;
use super::model::{
    CandidateFile, CandidateIdentity, ContentRegistry, DependencyRef, LookupQuery, RawMatches,
    RegistryId, RegistryMatch,
};
use crate::core::content::{ArtifactId, ContentArtifact};
use crate::core::error::{LauncherError, LauncherResult};

pub const CURSEFORGE_API: &str = "https://api.curseforge.com";
const MINECRAFT_GAME_ID: u32 = 432;

/// CurseForge mixes loader names into `gameVersions`.
const LOADER_TAGS: &[&str] = &[
    "forge",
    "neoforge",
    "fabric",
    "quilt",
    "liteloader",
    "cauldron",
    "rift",
    "iris",
    "optifine",
];

/// File hash algorithm ids as CurseForge reports them.
const HASH_ALGO_SHA1: u32 = 1;

/// `relationType` of a required dependency.
const RELATION_REQUIRED: u32 = 3;

// ── Wire types ──────────────────────────────────────────

#[derive(Debug, Serialize)]
struct FingerprintRequest<'a> {
    fingerprints: &'a [u32],
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FingerprintMatches {
    #[serde(default)]
    exact_matches: Vec<FingerprintMatch>,
    #[serde(default)]
    unmatched_fingerprints: Option<Vec<u32>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FingerprintMatch {
    file: CurseFile,
    #[serde(default)]
    latest_files: Vec<CurseFile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurseFile {
    #[serde(default)]
    mod_id: Option<u64>,
    #[serde(default)]
    file_name: String,
    file_date: DateTime<Utc>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    game_versions: Vec<String>,
    file_fingerprint: u32,
    #[serde(default)]
    hashes: Vec<CurseHash>,
    #[serde(default)]
    file_length: Option<u64>,
    #[serde(default)]
    dependencies: Vec<CurseDependency>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurseDependency {
    mod_id: u64,
    relation_type: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct CurseHash {
    value: String,
    algo: u32,
}

/// Registry B: fingerprint lookup. Requires an API key.
pub struct CurseForgeRegistry {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl CurseForgeRegistry {
    pub fn new(
        client: reqwest::Client,
        api_base: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout,
        }
    }

    fn unavailable(reason: impl Into<String>) -> LauncherError {
        LauncherError::RegistryUnavailable {
            registry: RegistryId::CurseForge.to_string(),
            reason: reason.into(),
        }
    }

    fn key(&self) -> LauncherResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Self::unavailable("no API key configured"))
    }
}

#[async_trait]
impl ContentRegistry for CurseForgeRegistry {
    fn id(&self) -> RegistryId {
        RegistryId::CurseForge
    }

    async fn lookup(
        &self,
        artifacts: &[&ContentArtifact],
        _query: &LookupQuery,
    ) -> LauncherResult<RawMatches> {
        if artifacts.is_empty() {
            return Ok(RawMatches::new());
        }
        let api_key = self.key()?;

        let mut by_fingerprint: HashMap<u32, Vec<ArtifactId>> = HashMap::new();
        for artifact in artifacts {
            by_fingerprint
                .entry(artifact.identity().fingerprint)
                .or_default()
                .push(artifact.id().clone());
        }
        let mut fingerprints: Vec<u32> = by_fingerprint.keys().copied().collect();
        fingerprints.sort_unstable();

        let url = format!(
            "{}/v1/fingerprints/{}",
            self.api_base.trim_end_matches('/'),
            MINECRAFT_GAME_ID
        );
        debug!("CurseForge lookup: {} fingerprints", fingerprints.len());

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("x-api-key", api_key)
            .header(ACCEPT, "application/json")
            .json(&FingerprintRequest {
                fingerprints: &fingerprints,
            })
            .send()
            .await
            .map_err(|e| Self::unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::unavailable(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Self::unavailable(e.to_string()))?;
        decode_response(&body, &by_fingerprint)
    }

    async fn resolve_dependency(
        &self,
        dependency: &DependencyRef,
        query: &LookupQuery,
    ) -> LauncherResult<Option<RegistryMatch>> {
        let Some(mod_id) = dependency.project_id.as_deref() else {
            return Ok(None);
        };
        let api_key = self.key()?;

        let url = format!("{}/v1/mods/{}/files", self.api_base.trim_end_matches('/'), mod_id);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .header("x-api-key", api_key)
            .header(ACCEPT, "application/json")
            .query(&[("gameVersion", query.game_version.as_str())])
            .send()
            .await
            .map_err(|e| Self::unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Self::unavailable(format!("HTTP {status}")));
        }
        let body = response
            .text()
            .await
            .map_err(|e| Self::unavailable(e.to_string()))?;
        decode_files(&body, query)
    }
}

fn decode_response(body: &str, by_fingerprint: &HashMap<u32, Vec<ArtifactId>>) -> LauncherResult<RawMatches> {
    let envelope: Envelope<FingerprintMatches> = serde_json::from_str(body)?;
    let data = envelope.data;
    if let Some(unmatched) = &data.unmatched_fingerprints {
        debug!("CurseForge: {} fingerprints unmatched", unmatched.len());
    }

    let mut matches = RawMatches::new();
    for exact in data.exact_matches {
        let Some(ids) = by_fingerprint.get(&exact.file.file_fingerprint) else {
            continue;
        };

        // The installed file only counts when it is still one of the latest.
        let mut candidates: Vec<RegistryMatch> = Vec::with_capacity(exact.latest_files.len());
        for file in &exact.latest_files {
            if candidates
                .iter()
                .any(|c| c.candidate.identity == CandidateIdentity::Fingerprint(file.file_fingerprint))
            {
                continue;
            }
            candidates.push(into_match(file));
        }

        for id in ids {
            matches
                .entry(id.clone())
                .or_default()
                .extend(candidates.iter().cloned());
        }
    }
    Ok(matches)
}

fn decode_files(body: &str, query: &LookupQuery) -> LauncherResult<Option<RegistryMatch>> {
    let envelope: Envelope<Vec<CurseFile>> = serde_json::from_str(body)?;
    let candidates: Vec<RegistryMatch> = envelope.data.iter().map(into_match).collect();
    Ok(newest_compatible(&candidates, query))
}

fn into_match(file: &CurseFile) -> RegistryMatch {
    let mut game_versions = BTreeSet::new();
    let mut loaders = BTreeSet::new();
    for tag in &file.game_versions {
        let lower = tag.to_ascii_lowercase();
        if LOADER_TAGS.contains(&lower.as_str()) {
            loaders.insert(lower);
        } else {
            game_versions.insert(tag.clone());
        }
    }

    let sha1 = file
        .hashes
        .iter()
        .find(|h| h.algo == HASH_ALGO_SHA1)
        .map(|h| h.value.to_ascii_lowercase());

    let dependencies = file
        .dependencies
        .iter()
        .filter(|d| d.relation_type == RELATION_REQUIRED)
        .map(|d| DependencyRef::project(d.mod_id.to_string()))
        .collect();

    RegistryMatch {
        registry_id: RegistryId::CurseForge,
        project_id: file.mod_id.map(|id| id.to_string()),
        candidate: CandidateFile {
            url: file.download_url.clone().filter(|u| !u.is_empty()),
            file_name: file.file_name.clone(),
            identity: CandidateIdentity::Fingerprint(file.file_fingerprint),
            sha1,
            sha512: None,
            size: file.file_length,
            publish_date: file.file_date,
        },
        compatible_game_versions: game_versions,
        compatible_loaders: loaders,
        dependencies,
    }
}
