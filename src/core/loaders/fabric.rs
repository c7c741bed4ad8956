use serde::Deserialize;

use super::source::Fetch;
use crate::core::error::LauncherResult;

/// One entry of `GET {meta}/versions/loader/{mc}`.
///
/// Fabric, Quilt and LegacyFabric all run the same meta service, so the
/// shape is shared.
#[derive(Debug, Deserialize)]
struct MetaLoaderEntry {
    loader: MetaLoader,
}

#[derive(Debug, Deserialize)]
struct MetaLoader {
    version: String,
}

/// Loader versions for `game_version`, newest first as the meta service lists them.
pub(crate) async fn list_versions(
    fetch: &Fetch<'_>,
    meta_base: &str,
    game_version: &str,
) -> LauncherResult<Vec<String>> {
    let url = format!(
        "{}/versions/loader/{}",
        meta_base.trim_end_matches('/'),
        game_version
    );
    let body = fetch.get_text(&url).await?;
    parse_loader_list(&body)
}

fn parse_loader_list(body: &str) -> LauncherResult<Vec<String>> {
    let entries: Vec<MetaLoaderEntry> = serde_json::from_str(body)?;
    let mut versions: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        let version = entry.loader.version.trim();
        if !version.is_empty() && !versions.iter().any(|v| v == version) {
            versions.push(version.to_string());
        }
    }
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_loader_versions_in_listed_order() {
        let body = r#"[
            {"loader": {"separator": ".", "build": 16, "maven": "net.fabricmc:fabric-loader:0.16.10", "version": "0.16.10", "stable": true},
             "intermediary": {"version": "1.21.1"}},
            {"loader": {"version": "0.16.9", "stable": true}},
            {"loader": {"version": "0.16.9"}}
        ]"#;

        let versions = parse_loader_list(body).unwrap();
        assert_eq!(versions, vec!["0.16.10", "0.16.9"]);
    }

    #[test]
    fn empty_array_means_no_versions() {
        assert!(parse_loader_list("[]").unwrap().is_empty());
    }

    #[test]
    fn rejects_unexpected_payload() {
        assert!(parse_loader_list(r#"{"error": "nope"}"#).is_err());
    }
}
