use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::chain::newest_compatible;
use super::model::{
    CandidateFile, CandidateIdentity, ContentRegistry, DependencyRef, LookupQuery, RawMatches,
    RegistryId, RegistryMatch,
};
use crate::core::content::{ArtifactId, ContentArtifact};
use crate::core::error::{LauncherError, LauncherResult};

pub const MODRINTH_API: &str = "https://api.modrinth.com";

// ── Wire types ──────────────────────────────────────────

#[derive(Debug, Serialize)]
struct UpdateRequest<'a> {
    hashes: Vec<&'a str>,
    algorithm: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    loaders: Vec<&'a str>,
    game_versions: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ModrinthVersion {
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    game_versions: Vec<String>,
    #[serde(default)]
    loaders: Vec<String>,
    date_published: DateTime<Utc>,
    #[serde(default)]
    files: Vec<ModrinthFile>,
    #[serde(default)]
    dependencies: Vec<ModrinthDependency>,
}

#[derive(Debug, Deserialize)]
struct ModrinthDependency {
    #[serde(default)]
    version_id: Option<String>,
    #[serde(default)]
    project_id: Option<String>,
    dependency_type: String,
}

#[derive(Debug, Deserialize)]
struct ModrinthFile {
    hashes: ModrinthHashes,
    url: String,
    filename: String,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ModrinthHashes {
    sha1: String,
    #[serde(default)]
    sha512: Option<String>,
}

/// Registry A: exact SHA-1 lookup through `version_files/update`.
pub struct ModrinthRegistry {
    client: reqwest::Client,
    api_base: String,
    timeout: Duration,
}

impl ModrinthRegistry {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            timeout,
        }
    }

    fn unavailable(reason: impl Into<String>) -> LauncherError {
        LauncherError::RegistryUnavailable {
            registry: RegistryId::Modrinth.to_string(),
            reason: reason.into(),
        }
    }

    /// GET a JSON document; 404 is `None`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> LauncherResult<Option<T>> {
        let url = format!("{}{}", self.api_base.trim_end_matches('/'), path);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .query(query)
            .send()
            .await
            .map_err(|e| Self::unavailable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Self::unavailable(format!("HTTP {status}")));
        }
        let body = response
            .text()
            .await
            .map_err(|e| Self::unavailable(e.to_string()))?;
        Ok(Some(serde_json::from_str(&body)?))
    }
}

#[async_trait]
impl ContentRegistry for ModrinthRegistry {
    fn id(&self) -> RegistryId {
        RegistryId::Modrinth
    }

    async fn lookup(
        &self,
        artifacts: &[&ContentArtifact],
        query: &LookupQuery,
    ) -> LauncherResult<RawMatches> {
        if artifacts.is_empty() {
            return Ok(RawMatches::new());
        }

        let mut by_hash: HashMap<String, Vec<ArtifactId>> = HashMap::new();
        for artifact in artifacts {
            by_hash
                .entry(artifact.identity().sha1.to_ascii_lowercase())
                .or_default()
                .push(artifact.id().clone());
        }

        let request = UpdateRequest {
            hashes: by_hash.keys().map(String::as_str).collect(),
            algorithm: "sha1",
            loaders: query.loaders.iter().map(String::as_str).collect(),
            game_versions: vec![query.game_version.as_str()],
        };

        let url = format!(
            "{}/v2/version_files/update",
            self.api_base.trim_end_matches('/')
        );
        debug!("Modrinth lookup: {} hashes", request.hashes.len());

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&request)
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
        decode_response(&body, &by_hash)
    }

    async fn resolve_dependency(
        &self,
        dependency: &DependencyRef,
        query: &LookupQuery,
    ) -> LauncherResult<Option<RegistryMatch>> {
        if let Some(version_id) = &dependency.version_id {
            let version: Option<ModrinthVersion> =
                self.get_json(&format!("/v2/version/{version_id}"), &[]).await?;
            return Ok(version.and_then(into_match));
        }
        let Some(project_id) = &dependency.project_id else {
            return Ok(None);
        };

        let mut params = vec![(
            "game_versions",
            serde_json::to_string(&[query.game_version.as_str()])?,
        )];
        if !query.loaders.is_empty() {
            params.push(("loaders", serde_json::to_string(&query.loaders)?));
        }
        let versions: Option<Vec<ModrinthVersion>> = self
            .get_json(&format!("/v2/project/{project_id}/version"), &params)
            .await?;

        let candidates: Vec<RegistryMatch> = versions
            .unwrap_or_default()
            .into_iter()
            .filter_map(into_match)
            .collect();
        Ok(newest_compatible(&candidates, query))
    }
}

fn decode_response(body: &str, by_hash: &HashMap<String, Vec<ArtifactId>>) -> LauncherResult<RawMatches> {
    let versions: HashMap<String, ModrinthVersion> = serde_json::from_str(body)?;

    let mut matches = RawMatches::new();
    for (hash, version) in versions {
        let Some(ids) = by_hash.get(&hash.to_ascii_lowercase()) else {
            continue;
        };
        let Some(found) = into_match(version) else {
            continue;
        };
        for id in ids {
            matches.entry(id.clone()).or_default().push(found.clone());
        }
    }
    Ok(matches)
}

fn into_match(version: ModrinthVersion) -> Option<RegistryMatch> {
    let ModrinthVersion {
        project_id,
        game_versions,
        loaders,
        date_published,
        mut files,
        dependencies,
    } = version;

    let index = files.iter().position(|f| f.primary).unwrap_or(0);
    if index >= files.len() {
        return None;
    }
    let file = files.swap_remove(index);

    let dependencies = dependencies
        .into_iter()
        .filter(|d| d.dependency_type == "required")
        .map(|d| DependencyRef {
            project_id: d.project_id,
            version_id: d.version_id,
        })
        .filter(|d| d.key().is_some())
        .collect();

    Some(RegistryMatch {
        registry_id: RegistryId::Modrinth,
        project_id,
        candidate: CandidateFile {
            url: Some(file.url),
            file_name: file.filename,
            identity: CandidateIdentity::Sha1(file.hashes.sha1.to_ascii_lowercase()),
            sha1: Some(file.hashes.sha1.to_ascii_lowercase()),
            sha512: file.hashes.sha512,
            size: file.size,
            publish_date: date_published,
        },
        compatible_game_versions: game_versions.into_iter().collect::<BTreeSet<_>>(),
        compatible_loaders: loaders.into_iter().collect::<BTreeSet<_>>(),
        dependencies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(pairs: &[(&str, &str)]) -> HashMap<String, Vec<ArtifactId>> {
        let mut map: HashMap<String, Vec<ArtifactId>> = HashMap::new();
        for (hash, path) in pairs {
            map.entry(hash.to_string())
                .or_default()
                .push(ArtifactId::from(std::path::PathBuf::from(path)));
        }
        map
    }

    const RESPONSE: &str = r#"{
        "aaaa": {
            "id": "v1", "project_id": "AANobbMI", "name": "Sodium 0.5.8",
            "version_number": "mc1.20.1-0.5.8",
            "game_versions": ["1.20.1"],
            "loaders": ["fabric", "quilt"],
            "date_published": "2024-02-10T12:00:00Z",
            "files": [
                {"hashes": {"sha1": "BBBB", "sha512": "cccc"}, "url": "https://cdn.modrinth.com/sodium-sources.jar",
                 "filename": "sodium-sources.jar", "primary": false, "size": 10},
                {"hashes": {"sha1": "BBBB", "sha512": "dddd"}, "url": "https://cdn.modrinth.com/sodium.jar",
                 "filename": "sodium-fabric-0.5.8.jar", "primary": true, "size": 20}
            ],
            "dependencies": [
                {"version_id": null, "project_id": "P7dR8mSH", "dependency_type": "required"},
                {"version_id": "abc123", "project_id": null, "dependency_type": "required"},
                {"version_id": null, "project_id": "YL57xq9U", "dependency_type": "optional"},
                {"version_id": null, "project_id": null, "dependency_type": "required"}
            ]
        },
        "ffff": {
            "game_versions": ["1.20.1"], "loaders": ["fabric"],
            "date_published": "2024-01-01T00:00:00Z", "files": []
        }
    }"#;

    #[test]
    fn decodes_primary_file_per_hash() {
        let map = ids(&[("aaaa", "mods/sodium.jar"), ("ffff", "mods/empty.jar")]);
        let matches = decode_response(RESPONSE, &map).unwrap();

        let sodium = &matches[&ArtifactId::from(std::path::PathBuf::from("mods/sodium.jar"))];
        assert_eq!(sodium.len(), 1);
        let m = &sodium[0];
        assert_eq!(m.registry_id, RegistryId::Modrinth);
        assert_eq!(m.candidate.file_name, "sodium-fabric-0.5.8.jar");
        assert_eq!(m.candidate.identity, CandidateIdentity::Sha1("bbbb".into()));
        assert_eq!(m.candidate.sha512.as_deref(), Some("dddd"));
        assert!(m.supports_game_version("1.20.1"));
        assert!(m.compatible_loaders.contains("quilt"));
        assert_eq!(m.project_id.as_deref(), Some("AANobbMI"));
        assert_eq!(
            m.dependencies,
            vec![
                DependencyRef::project("P7dR8mSH"),
                DependencyRef {
                    project_id: None,
                    version_id: Some("abc123".into()),
                },
            ]
        );

        // A version without files cannot be offered.
        assert!(!matches.contains_key(&ArtifactId::from(std::path::PathBuf::from("mods/empty.jar"))));
    }

    #[test]
    fn project_versions_pick_newest_compatible() {
        let body = r#"[
            {"project_id": "P7dR8mSH", "game_versions": ["1.20.1"], "loaders": ["fabric"],
             "date_published": "2024-03-01T00:00:00Z",
             "files": [{"hashes": {"sha1": "01"}, "url": "https://cdn.modrinth.com/fabric-api-new.jar",
                        "filename": "fabric-api-new.jar", "primary": true}]},
            {"project_id": "P7dR8mSH", "game_versions": ["1.20.1"], "loaders": ["fabric"],
             "date_published": "2024-01-01T00:00:00Z",
             "files": [{"hashes": {"sha1": "02"}, "url": "https://cdn.modrinth.com/fabric-api-old.jar",
                        "filename": "fabric-api-old.jar", "primary": true}]},
            {"project_id": "P7dR8mSH", "game_versions": ["1.21"], "loaders": ["fabric"],
             "date_published": "2024-06-01T00:00:00Z",
             "files": [{"hashes": {"sha1": "03"}, "url": "https://cdn.modrinth.com/fabric-api-1.21.jar",
                        "filename": "fabric-api-1.21.jar", "primary": true}]}
        ]"#;
        let versions: Vec<ModrinthVersion> = serde_json::from_str(body).unwrap();
        let candidates: Vec<RegistryMatch> = versions.into_iter().filter_map(into_match).collect();
        let query = LookupQuery {
            game_version: "1.20.1".into(),
            loaders: vec!["fabric".into()],
            prefer_loaders: true,
        };

        let best = newest_compatible(&candidates, &query).unwrap();
        assert_eq!(best.candidate.file_name, "fabric-api-new.jar");
    }

    #[test]
    fn request_omits_empty_loader_list() {
        let request = UpdateRequest {
            hashes: vec!["aaaa"],
            algorithm: "sha1",
            loaders: Vec::new(),
            game_versions: vec!["1.20.1"],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("loaders").is_none());
        assert_eq!(json["algorithm"], "sha1");
    }
}
