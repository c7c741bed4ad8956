use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::content::{ContentKind, ContentPolicy};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::loaders::LoaderEndpoints;
use crate::core::registry::{CURSEFORGE_API, MODRINTH_API};

const APP_DIR_NAME: &str = "InterfaceOficial";
const SETTINGS_FILE: &str = "sync_settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub modrinth_api_base: String,
    pub curseforge_api_base: String,
    /// CurseForge refuses anonymous requests; without a key it is skipped.
    pub curseforge_api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub max_parallel_downloads: usize,
    pub loader_endpoints: LoaderEndpoints,
    pub content_policies: BTreeMap<ContentKind, ContentPolicy>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            modrinth_api_base: MODRINTH_API.into(),
            curseforge_api_base: CURSEFORGE_API.into(),
            curseforge_api_key: None,
            request_timeout_secs: 30,
            max_parallel_downloads: 4,
            loader_endpoints: LoaderEndpoints::default(),
            content_policies: ContentKind::ALL
                .into_iter()
                .map(|kind| (kind, ContentPolicy::for_kind(kind)))
                .collect(),
        }
    }
}

impl SyncSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn policy_for(&self, kind: ContentKind) -> ContentPolicy {
        self.content_policies
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| ContentPolicy::for_kind(kind))
    }
}

/// Missing or unreadable settings fall back to defaults.
pub fn load_settings(data_dir: &Path) -> SyncSettings {
    let path = data_dir.join(SETTINGS_FILE);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(_) => return SyncSettings::default(),
    };
    match serde_json::from_str(&raw) {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Ignoring malformed {:?}: {}", path, e);
            SyncSettings::default()
        }
    }
}

pub fn save_settings(data_dir: &Path, settings: &SyncSettings) -> LauncherResult<()> {
    std::fs::create_dir_all(data_dir).map_err(|e| LauncherError::from_io(data_dir, e))?;
    let path = data_dir.join(SETTINGS_FILE);
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(&path, json).map_err(|e| LauncherError::from_io(&path, e))
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::content::LoaderFilter;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(dir.path());
        assert_eq!(settings, SyncSettings::default());
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn save_then_load_keeps_changes() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = SyncSettings::default();
        settings.curseforge_api_key = Some("key".into());
        settings.max_parallel_downloads = 8;
        settings
            .content_policies
            .get_mut(&ContentKind::ShaderPack)
            .unwrap()
            .registry_loaders = LoaderFilter::Fixed(vec!["iris".into()]);

        save_settings(dir.path(), &settings).unwrap();
        let loaded = load_settings(dir.path());

        assert_eq!(loaded, settings);
        assert_eq!(
            loaded.policy_for(ContentKind::ShaderPack).loaders_for(None),
            vec!["iris"]
        );
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"request_timeout_secs": 5, "content_policies": {}}"#,
        )
        .unwrap();

        let loaded = load_settings(dir.path());
        assert_eq!(loaded.request_timeout_secs, 5);
        assert_eq!(loaded.modrinth_api_base, MODRINTH_API);
        assert_eq!(
            loaded.policy_for(ContentKind::Mod),
            ContentPolicy::for_kind(ContentKind::Mod)
        );
    }

    #[test]
    fn malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{not json").unwrap();
        assert_eq!(load_settings(dir.path()), SyncSettings::default());
    }
}
