use std::fmt;

use serde::{Deserialize, Serialize};

/// What lives in a content directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Mod,
    ResourcePack,
    ShaderPack,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [
        ContentKind::Mod,
        ContentKind::ResourcePack,
        ContentKind::ShaderPack,
    ];

    /// Conventional folder name inside a game directory.
    pub fn dir_name(self) -> &'static str {
        match self {
            ContentKind::Mod => "mods",
            ContentKind::ResourcePack => "resourcepacks",
            ContentKind::ShaderPack => "shaderpacks",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContentKind::Mod => "mod",
            ContentKind::ResourcePack => "resource pack",
            ContentKind::ShaderPack => "shader pack",
        })
    }
}

/// Which loader names are sent to the registries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoaderFilter {
    /// The instance's own loader, if it has one.
    Selected,
    /// A fixed list regardless of the instance.
    Fixed(Vec<String>),
}

/// Per-kind rules for scanning and updating content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPolicy {
    pub registry_loaders: LoaderFilter,
    /// Prefer candidates tagged with one of the loaders, falling back to
    /// any game-compatible candidate when none is tagged.
    pub apply_loader_preference: bool,
    /// Files named `{artifact}{suffix}` that belong to an artifact and are
    /// removed together with it.
    #[serde(default)]
    pub sidecar_suffixes: Vec<String>,
    /// Lower-case extensions, without the dot.
    pub extensions: Vec<String>,
    /// Fetch the required dependencies of replaced files into the same folder.
    #[serde(default)]
    pub install_dependencies: bool,
}

impl ContentPolicy {
    pub fn for_kind(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Mod => Self {
                registry_loaders: LoaderFilter::Selected,
                apply_loader_preference: true,
                sidecar_suffixes: Vec::new(),
                extensions: vec!["jar".into()],
                install_dependencies: true,
            },
            ContentKind::ResourcePack => Self {
                registry_loaders: LoaderFilter::Fixed(vec!["minecraft".into()]),
                apply_loader_preference: false,
                sidecar_suffixes: Vec::new(),
                extensions: vec!["zip".into()],
                install_dependencies: false,
            },
            // Iris/OptiFine guardan las opciones del shader en `{pack}.txt`.
            ContentKind::ShaderPack => Self {
                registry_loaders: LoaderFilter::Fixed(vec![
                    "iris".into(),
                    "optifine".into(),
                    "minecraft".into(),
                ]),
                apply_loader_preference: false,
                sidecar_suffixes: vec![".txt".into()],
                extensions: vec!["zip".into()],
                install_dependencies: false,
            },
        }
    }

    /// Loader names to send for an instance running `selected`.
    pub fn loaders_for(&self, selected: Option<&str>) -> Vec<String> {
        match &self.registry_loaders {
            LoaderFilter::Selected => selected.map(|s| vec![s.to_string()]).unwrap_or_default(),
            LoaderFilter::Fixed(loaders) => loaders.clone(),
        }
    }

    pub fn accepts_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }
}
