use tracing::debug;

use super::source::Fetch;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::{sort_newest_first, MavenMetadata};

// Forge, NeoForge and Cleanroom publish their builds as Maven artifacts;
// the version list is read straight from `maven-metadata.xml`.

async fn fetch_metadata(fetch: &Fetch<'_>, repo: &str, path: &str) -> LauncherResult<Vec<String>> {
    let url = format!("{}/{}/maven-metadata.xml", repo.trim_end_matches('/'), path);
    let xml = fetch.get_text(&url).await?;
    Ok(MavenMetadata::parse(&xml)?.versions())
}

/// Forge builds are published as `{mc}-{forge}`; the prefix is stripped.
pub(crate) async fn list_forge(
    fetch: &Fetch<'_>,
    repo: &str,
    game_version: &str,
) -> LauncherResult<Vec<String>> {
    let all = fetch_metadata(fetch, repo, "net/minecraftforge/forge").await?;
    Ok(filter_forge(all, game_version))
}

fn filter_forge(all: Vec<String>, game_version: &str) -> Vec<String> {
    let prefix = format!("{game_version}-");
    let suffix = format!("-{game_version}");
    let mut versions: Vec<String> = all
        .iter()
        .filter_map(|v| v.strip_prefix(&prefix))
        // Algunas builds antiguas llevan el sufijo de la versión de MC.
        .map(|v| v.strip_suffix(&suffix).unwrap_or(v).to_string())
        .collect();
    sort_newest_first(&mut versions);
    versions
}

/// NeoForge numbers its builds after the game version: `1.20.4` maps to
/// `20.4.x` and `1.21` to `21.0.x`. For 1.20.1 the builds were still
/// published under the legacy `net.neoforged:forge` coordinates.
pub(crate) async fn list_neoforge(
    fetch: &Fetch<'_>,
    repo: &str,
    game_version: &str,
) -> LauncherResult<Vec<String>> {
    let Some(prefix) = neoforge_prefix(game_version) else {
        debug!("No NeoForge numbering for {}", game_version);
        return Ok(Vec::new());
    };

    let all = fetch_metadata(fetch, repo, "net/neoforged/neoforge").await?;
    let mut versions = filter_neoforge(all, &prefix);

    if game_version == "1.20.1" {
        match fetch_metadata(fetch, repo, "net/neoforged/forge").await {
            Ok(legacy) => versions = merge_legacy_neoforge(versions, legacy, game_version),
            Err(LauncherError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
    }

    Ok(versions)
}

/// Legacy builds read `1.20.1-47.1.106`; they join the list as `47.1.106`.
fn merge_legacy_neoforge(current: Vec<String>, legacy: Vec<String>, game_version: &str) -> Vec<String> {
    let prefix = format!("{game_version}-");
    let mut versions = current;
    versions.extend(
        legacy
            .into_iter()
            .map(|v| v.strip_prefix(&prefix).map(str::to_string).unwrap_or(v)),
    );
    sort_newest_first(&mut versions);
    versions
}

fn neoforge_prefix(game_version: &str) -> Option<String> {
    let mut parts = game_version.split('.');
    if parts.next()? != "1" {
        return None;
    }
    let minor = parts.next().filter(|p| !p.is_empty())?;
    let patch = parts.next().unwrap_or("0");
    Some(format!("{minor}.{patch}"))
}

fn filter_neoforge(all: Vec<String>, prefix: &str) -> Vec<String> {
    let dotted = format!("{prefix}.");
    let dashed = format!("{prefix}-");
    let mut versions: Vec<String> = all
        .into_iter()
        .filter(|v| v.starts_with(&dotted) || v.starts_with(&dashed))
        .collect();
    sort_newest_first(&mut versions);
    versions
}

/// Cleanroom only exists for 1.12.2.
pub(crate) async fn list_cleanroom(
    fetch: &Fetch<'_>,
    repo: &str,
    game_version: &str,
) -> LauncherResult<Vec<String>> {
    if game_version != "1.12.2" {
        return Ok(Vec::new());
    }
    let mut versions = fetch_metadata(fetch, repo, "com/cleanroommc/cleanroom").await?;
    sort_newest_first(&mut versions);
    Ok(versions)
}
