use quick_xml::de::from_str;
use serde::Deserialize;

use crate::core::error::LauncherResult;

/// `maven-metadata.xml` – only the version list is of interest.
#[derive(Debug, Deserialize, Default)]
pub struct MavenMetadata {
    #[serde(default)]
    pub versioning: MavenVersioning,
}

#[derive(Debug, Deserialize, Default)]
pub struct MavenVersioning {
    #[serde(default)]
    pub versions: MavenVersions,
}

#[derive(Debug, Deserialize, Default)]
pub struct MavenVersions {
    #[serde(rename = "version", default)]
    pub version: Vec<String>,
}

impl MavenMetadata {
    pub fn parse(xml: &str) -> LauncherResult<Self> {
        Ok(from_str(xml)?)
    }

    /// Versions in publication order (oldest first, as Maven lists them).
    pub fn versions(self) -> Vec<String> {
        self.versioning
            .versions
            .version
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    }
}

/// Numeric sort key so `47.10.0` ranks above `47.9.1`.
pub fn version_sort_key(version: &str) -> Vec<u64> {
    version
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u64>().unwrap_or(0))
        .collect()
}

/// Sort newest first and drop duplicates.
pub fn sort_newest_first(versions: &mut Vec<String>) {
    versions.sort_by(|a, b| {
        version_sort_key(b)
            .cmp(&version_sort_key(a))
            .then_with(|| b.cmp(a))
    });
    versions.dedup();
}
