use std::collections::HashMap;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::model::{ContentRegistry, DependencyRef, LookupQuery, RegistryId, RegistryMatch};
use crate::core::content::{ArtifactId, ContentArtifact};
use crate::core::error::{LauncherError, LauncherResult};

pub type LookupResult = HashMap<ArtifactId, Option<RegistryMatch>>;

/// Queries registries in order; the first registry with a compatible
/// candidate for an artifact wins it.
///
/// Each registry is called at most once per run and only with the
/// artifacts still unmatched at that point. A failing or cancelled registry
/// is skipped; its artifacts simply move on to the next one.
pub struct RegistryLookupChain<R> {
    registries: Vec<R>,
}

impl<R: ContentRegistry> RegistryLookupChain<R> {
    pub fn new(registries: Vec<R>) -> Self {
        Self { registries }
    }

    pub async fn batch_lookup(
        &self,
        artifacts: &[ContentArtifact],
        query: &LookupQuery,
        token: &CancellationToken,
    ) -> LookupResult {
        let mut result: LookupResult = artifacts.iter().map(|a| (a.id().clone(), None)).collect();

        for registry in &self.registries {
            let pending: Vec<&ContentArtifact> = artifacts
                .iter()
                .filter(|a| matches!(result.get(a.id()), Some(None)))
                .collect();
            if pending.is_empty() {
                break;
            }

            info!("Querying {} for {} artifacts", registry.id(), pending.len());
            let raw = tokio::select! {
                biased;
                _ = token.cancelled() => Err(LauncherError::Cancelled),
                r = registry.lookup(&pending, query) => r,
            };
            let raw = match raw {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("{} lookup skipped: {}", registry.id(), e);
                    continue;
                }
            };

            let mut matched = 0usize;
            for artifact in pending {
                let Some(candidates) = raw.get(artifact.id()) else {
                    continue;
                };
                match select_candidate(artifact, candidates, query) {
                    Some(best) => {
                        matched += 1;
                        result.insert(artifact.id().clone(), Some(best));
                    }
                    None => debug!(
                        "{}: no candidate from {} fits {}",
                        artifact.id(),
                        registry.id(),
                        query.game_version
                    ),
                }
            }
            info!("{} matched {} artifacts", registry.id(), matched);
        }

        result
    }

    /// Ask the registry a candidate came from for one of its dependencies.
    pub async fn resolve_dependency(
        &self,
        registry: RegistryId,
        dependency: &DependencyRef,
        query: &LookupQuery,
        token: &CancellationToken,
    ) -> LauncherResult<Option<RegistryMatch>> {
        let Some(source) = self.registries.iter().find(|r| r.id() == registry) else {
            return Ok(None);
        };
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(LauncherError::Cancelled),
            r = source.resolve_dependency(dependency, query) => r,
        }
    }
}

/// Game-version filter, advisory loader preference, then newest wins.
///
/// Candidates without a download URL are only usable when they are the
/// file already installed.
pub(crate) fn select_candidate(
    artifact: &ContentArtifact,
    candidates: &[RegistryMatch],
    query: &LookupQuery,
) -> Option<RegistryMatch> {
    pick(candidates, query, |m| m.candidate.identity.matches(artifact.identity()))
}

/// Same rules for a file nothing local corresponds to yet.
pub(crate) fn newest_compatible(candidates: &[RegistryMatch], query: &LookupQuery) -> Option<RegistryMatch> {
    pick(candidates, query, |_| false)
}

fn pick(
    candidates: &[RegistryMatch],
    query: &LookupQuery,
    is_current: impl Fn(&RegistryMatch) -> bool,
) -> Option<RegistryMatch> {
    let compatible: Vec<&RegistryMatch> = candidates
        .iter()
        .filter(|m| m.supports_game_version(&query.game_version))
        .filter(|m| m.candidate.url.is_some() || is_current(*m))
        .collect();

    let pool: Vec<&RegistryMatch> = if query.prefer_loaders && !query.loaders.is_empty() {
        let tagged: Vec<&RegistryMatch> = compatible
            .iter()
            .copied()
            .filter(|m| m.supports_any_loader(&query.loaders))
            .collect();
        if tagged.is_empty() {
            compatible
        } else {
            tagged
        }
    } else {
        compatible
    };

    pool.into_iter()
        .max_by(|a, b| {
            a.candidate
                .publish_date
                .cmp(&b.candidate.publish_date)
                .then_with(|| is_current(*a).cmp(&is_current(*b)))
        })
        .cloned()
}
