use std::collections::HashMap;

use serde::Deserialize;

use super::compatibility::is_offerable;
use super::kind::LoaderKind;
use super::source::Fetch;
use crate::core::error::LauncherResult;

#[derive(Debug, Deserialize)]
struct LiteLoaderManifest {
    #[serde(default)]
    versions: HashMap<String, LiteLoaderGameVersion>,
}

#[derive(Debug, Deserialize)]
struct LiteLoaderGameVersion {
    #[serde(default)]
    artefacts: Option<LiteLoaderStream>,
    #[serde(default)]
    snapshots: Option<LiteLoaderStream>,
}

#[derive(Debug, Deserialize)]
struct LiteLoaderStream {
    #[serde(rename = "com.mumfrey:liteloader", default)]
    builds: HashMap<String, LiteLoaderBuild>,
}

#[derive(Debug, Deserialize)]
struct LiteLoaderBuild {
    version: String,
    #[serde(default)]
    timestamp: Option<String>,
}

/// The manifest is a single document covering every game version.
pub(crate) async fn list_versions(
    fetch: &Fetch<'_>,
    manifest_url: &str,
    game_version: &str,
) -> LauncherResult<Vec<String>> {
    if !is_offerable(LoaderKind::LiteLoader, game_version) {
        return Ok(Vec::new());
    }
    let body = fetch.get_text(manifest_url).await?;
    parse_manifest(&body, game_version)
}

fn parse_manifest(body: &str, game_version: &str) -> LauncherResult<Vec<String>> {
    let manifest: LiteLoaderManifest = serde_json::from_str(body)?;
    let Some(entry) = manifest.versions.get(game_version) else {
        return Ok(Vec::new());
    };

    let mut builds: Vec<&LiteLoaderBuild> = entry
        .artefacts
        .iter()
        .chain(entry.snapshots.iter())
        .flat_map(|stream| stream.builds.values())
        .collect();

    // Newest timestamp first; builds without one sink to the bottom.
    builds.sort_by_key(|b| {
        std::cmp::Reverse(
            b.timestamp
                .as_deref()
                .and_then(|t| t.parse::<u64>().ok())
                .unwrap_or(0),
        )
    });

    let mut versions: Vec<String> = Vec::new();
    for build in builds {
        if !versions.contains(&build.version) {
            versions.push(build.version.clone());
        }
    }
    Ok(versions)
}
