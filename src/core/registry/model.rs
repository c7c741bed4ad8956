use std::collections::{BTreeSet, HashMap};
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::content::{ArtifactId, ContentArtifact, ContentIdentity};
use crate::core::error::LauncherResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryId {
    Modrinth,
    CurseForge,
}

impl fmt::Display for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegistryId::Modrinth => "Modrinth",
            RegistryId::CurseForge => "CurseForge",
        })
    }
}

/// Identity of a candidate in the scheme of the registry that returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "scheme", content = "value")]
pub enum CandidateIdentity {
    Sha1(String),
    Fingerprint(u32),
}

impl CandidateIdentity {
    /// Compare against a local identity using the same scheme.
    pub fn matches(&self, local: &ContentIdentity) -> bool {
        match self {
            CandidateIdentity::Sha1(hash) => hash.eq_ignore_ascii_case(&local.sha1),
            CandidateIdentity::Fingerprint(fp) => *fp == local.fingerprint,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFile {
    /// `None` when the author disabled third-party distribution.
    pub url: Option<String>,
    pub file_name: String,
    pub identity: CandidateIdentity,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub sha512: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    pub publish_date: DateTime<Utc>,
}

/// A required dependency as the registry names it. At least one of the
/// two ids is set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyRef {
    pub project_id: Option<String>,
    /// Pinned version; `None` means "newest compatible".
    pub version_id: Option<String>,
}

impl DependencyRef {
    pub fn project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            version_id: None,
        }
    }

    /// Key used to visit each dependency once per run.
    pub fn key(&self) -> Option<&str> {
        self.version_id.as_deref().or(self.project_id.as_deref())
    }
}

/// One candidate a registry offers for an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryMatch {
    pub registry_id: RegistryId,
    /// Registry-side project the candidate belongs to.
    #[serde(default)]
    pub project_id: Option<String>,
    pub candidate: CandidateFile,
    pub compatible_game_versions: BTreeSet<String>,
    /// Advisory; may be empty when the registry does not tag loaders.
    pub compatible_loaders: BTreeSet<String>,
    /// Required dependencies of the candidate file.
    #[serde(default)]
    pub dependencies: Vec<DependencyRef>,
}

impl RegistryMatch {
    pub fn supports_game_version(&self, game_version: &str) -> bool {
        self.compatible_game_versions
            .iter()
            .any(|v| v.eq_ignore_ascii_case(game_version))
    }

    pub fn supports_any_loader(&self, loaders: &[String]) -> bool {
        loaders.iter().any(|wanted| {
            self.compatible_loaders
                .iter()
                .any(|l| l.eq_ignore_ascii_case(wanted))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    pub game_version: String,
    /// Sent to registries that filter server side.
    pub loaders: Vec<String>,
    /// Prefer candidates tagged with one of `loaders` when choosing locally.
    pub prefer_loaders: bool,
}

/// Raw registry output: every candidate per artifact, not yet filtered.
pub type RawMatches = HashMap<ArtifactId, Vec<RegistryMatch>>;

/// A remote content index that answers one batched identity lookup.
#[async_trait]
pub trait ContentRegistry: Send + Sync {
    fn id(&self) -> RegistryId;

    async fn lookup(
        &self,
        artifacts: &[&ContentArtifact],
        query: &LookupQuery,
    ) -> LauncherResult<RawMatches>;

    /// Newest file of `dependency` that fits `query`, or `None` when the
    /// project has nothing compatible. Registries without dependency
    /// metadata never report any.
    async fn resolve_dependency(
        &self,
        _dependency: &DependencyRef,
        _query: &LookupQuery,
    ) -> LauncherResult<Option<RegistryMatch>> {
        Ok(None)
    }
}
