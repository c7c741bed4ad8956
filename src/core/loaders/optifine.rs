use serde::Deserialize;

use super::source::Fetch;
use crate::core::error::LauncherResult;

/// Entry from BMCLAPI's `/optifine/{mc}` listing.
#[derive(Debug, Deserialize)]
struct OptiFineBuild {
    #[serde(rename = "type")]
    kind: String,
    patch: String,
}

impl OptiFineBuild {
    /// `HD_U_I6` style name; the resolver turns it into `HD_U:I6`.
    fn version_name(&self) -> String {
        format!("{}_{}", self.kind, self.patch)
    }
}

pub(crate) async fn list_versions(
    fetch: &Fetch<'_>,
    bmclapi: &str,
    game_version: &str,
) -> LauncherResult<Vec<String>> {
    let url = format!("{}/optifine/{}", bmclapi.trim_end_matches('/'), game_version);
    let body = fetch.get_text(&url).await?;
    parse_builds(&body)
}

fn parse_builds(body: &str) -> LauncherResult<Vec<String>> {
    let builds: Vec<OptiFineBuild> = serde_json::from_str(body)?;
    let mut versions: Vec<String> = Vec::with_capacity(builds.len());
    // BMCLAPI lista de más antigua a más nueva.
    for build in builds.iter().rev() {
        let name = build.version_name();
        if !versions.contains(&name) {
            versions.push(name);
        }
    }
    Ok(versions)
}
