use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::LauncherError;

/// Every loader or addon the version-selection screen can offer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    Forge,
    Fabric,
    NeoForge,
    Quilt,
    Cleanroom,
    LegacyFabric,
    OptiFine,
    LiteLoader,
}

impl LoaderKind {
    pub const ALL: [LoaderKind; 8] = [
        LoaderKind::Forge,
        LoaderKind::Fabric,
        LoaderKind::NeoForge,
        LoaderKind::Quilt,
        LoaderKind::Cleanroom,
        LoaderKind::LegacyFabric,
        LoaderKind::OptiFine,
        LoaderKind::LiteLoader,
    ];

    /// Primary loaders are mutually exclusive; at most one per instance.
    pub fn is_primary(self) -> bool {
        !self.is_addon()
    }

    /// OptiFine and LiteLoader layer on Forge or install standalone.
    pub fn is_addon(self) -> bool {
        matches!(self, LoaderKind::OptiFine | LoaderKind::LiteLoader)
    }

    /// Position among addons when several share one plan.
    pub(crate) fn addon_priority(self) -> u8 {
        match self {
            LoaderKind::OptiFine => 0,
            LoaderKind::LiteLoader => 1,
            _ => u8::MAX,
        }
    }

    /// Lowercase identifier used by registries and version ids.
    pub fn id(self) -> &'static str {
        match self {
            LoaderKind::Forge => "forge",
            LoaderKind::Fabric => "fabric",
            LoaderKind::NeoForge => "neoforge",
            LoaderKind::Quilt => "quilt",
            LoaderKind::Cleanroom => "cleanroom",
            LoaderKind::LegacyFabric => "legacyfabric",
            LoaderKind::OptiFine => "optifine",
            LoaderKind::LiteLoader => "liteloader",
        }
    }

    /// Loader tag content registries use for mods built against this kind.
    /// Cleanroom runs Forge mods.
    pub fn registry_loader(self) -> &'static str {
        match self {
            LoaderKind::Cleanroom => "forge",
            LoaderKind::LegacyFabric => "legacy-fabric",
            other => other.id(),
        }
    }
}

impl std::fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoaderKind::Forge => write!(f, "Forge"),
            LoaderKind::Fabric => write!(f, "Fabric"),
            LoaderKind::NeoForge => write!(f, "NeoForge"),
            LoaderKind::Quilt => write!(f, "Quilt"),
            LoaderKind::Cleanroom => write!(f, "Cleanroom"),
            LoaderKind::LegacyFabric => write!(f, "LegacyFabric"),
            LoaderKind::OptiFine => write!(f, "OptiFine"),
            LoaderKind::LiteLoader => write!(f, "LiteLoader"),
        }
    }
}

impl FromStr for LoaderKind {
    type Err = LauncherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
        LoaderKind::ALL
            .into_iter()
            .find(|kind| kind.id() == normalized)
            .ok_or_else(|| LauncherError::Other(format!("Unknown loader kind: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ui_and_registry_spellings() {
        assert_eq!("liteloader".parse::<LoaderKind>().unwrap(), LoaderKind::LiteLoader);
        assert_eq!("Legacy-Fabric".parse::<LoaderKind>().unwrap(), LoaderKind::LegacyFabric);
        assert_eq!("OptiFine".parse::<LoaderKind>().unwrap(), LoaderKind::OptiFine);
        assert!("rift".parse::<LoaderKind>().is_err());
    }

    #[test]
    fn only_optifine_and_liteloader_are_addons() {
        let addons: Vec<_> = LoaderKind::ALL.into_iter().filter(|k| k.is_addon()).collect();
        assert_eq!(addons, vec![LoaderKind::OptiFine, LoaderKind::LiteLoader]);
    }

    #[test]
    fn registry_loader_tags() {
        assert_eq!(LoaderKind::Cleanroom.registry_loader(), "forge");
        assert_eq!(LoaderKind::LegacyFabric.registry_loader(), "legacy-fabric");
        assert_eq!(LoaderKind::Quilt.registry_loader(), "quilt");
    }

    #[test]
    fn serde_uses_lowercase_ids() {
        let json = serde_json::to_string(&LoaderKind::NeoForge).unwrap();
        assert_eq!(json, "\"neoforge\"");
    }
}
