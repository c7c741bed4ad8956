// ─── Loader selection state ───
// Backs the version-selection screen. Every mutation computes the whole
// next state first, so callers never observe a half-applied exclusion.

use serde::Serialize;
use tracing::debug;

use super::compatibility::{
    addon_pair_compatibility, compatibility, is_offerable, offerable_loaders, Compatibility,
};
use super::kind::LoaderKind;
use super::resolver::{resolve, InstallPlan, LoaderChoice};
use crate::core::error::{LauncherError, LauncherResult, ValidationError};

/// Per-item lifecycle: `Unselected -> Selecting -> Selected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Unselected,
    /// Selected, waiting for its version list.
    Selecting,
    /// Selected with a chosen version.
    Selected,
}

/// One selectable loader on the screen.
#[derive(Debug, Clone, Serialize)]
pub struct ModLoaderItem {
    pub kind: LoaderKind,
    pub versions: Vec<String>,
    pub selected_version: Option<String>,
    pub state: ItemState,
    pub has_loaded: bool,
}

impl ModLoaderItem {
    fn new(kind: LoaderKind) -> Self {
        Self {
            kind,
            versions: Vec::new(),
            selected_version: None,
            state: ItemState::Unselected,
            has_loaded: false,
        }
    }

    pub fn name(&self) -> String {
        self.kind.to_string()
    }

    pub fn is_selected(&self) -> bool {
        self.state != ItemState::Unselected
    }
}

/// What a `select` call changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOutcome {
    /// Items deselected by mutual exclusion.
    pub deselected: Vec<LoaderKind>,
    /// The caller should fetch versions for the selected kind.
    pub needs_versions: bool,
}

#[derive(Debug, Clone)]
pub struct LoaderSelector {
    game_version: String,
    items: Vec<ModLoaderItem>,
}

impl LoaderSelector {
    /// Open the screen for `game_version` with only the offerable kinds.
    pub fn new(game_version: impl Into<String>) -> Self {
        let game_version = game_version.into();
        let items = offerable_loaders(&game_version)
            .into_iter()
            .map(ModLoaderItem::new)
            .collect();
        Self {
            game_version,
            items,
        }
    }

    pub fn game_version(&self) -> &str {
        &self.game_version
    }

    pub fn items(&self) -> &[ModLoaderItem] {
        &self.items
    }

    pub fn item(&self, kind: LoaderKind) -> Option<&ModLoaderItem> {
        self.items.iter().find(|i| i.kind == kind)
    }

    fn item_index(&self, kind: LoaderKind) -> LauncherResult<usize> {
        self.items
            .iter()
            .position(|i| i.kind == kind)
            .ok_or_else(|| {
                LauncherError::Other(format!(
                    "{} is not available for Minecraft {}",
                    kind, self.game_version
                ))
            })
    }

    pub fn primary(&self) -> Option<LoaderKind> {
        self.items
            .iter()
            .find(|i| i.is_selected() && i.kind.is_primary())
            .map(|i| i.kind)
    }

    /// Table lookup for `kind` against the whole current selection.
    pub fn check(&self, kind: LoaderKind) -> Compatibility {
        if !is_offerable(kind, &self.game_version) {
            return Compatibility::Disallowed;
        }
        if self.conflicts_for(kind).is_empty() {
            Compatibility::Allowed
        } else {
            Compatibility::Replaces
        }
    }

    /// Items that must be deselected if `candidate` becomes selected.
    fn conflicts_for(&self, candidate: LoaderKind) -> Vec<LoaderKind> {
        let primary = self.primary();
        let mut conflicts = Vec::new();

        if candidate.is_primary() {
            if let Some(current) = primary.filter(|p| *p != candidate) {
                conflicts.push(current);
            }
            // The new primary must also accept every selected addon.
            for item in self.items.iter().filter(|i| i.is_selected() && i.kind.is_addon()) {
                if compatibility(item.kind, Some(candidate)) != Compatibility::Allowed {
                    conflicts.push(item.kind);
                }
            }
        } else {
            if compatibility(candidate, primary) == Compatibility::Replaces {
                conflicts.extend(primary);
            }
            let host = primary.filter(|p| !conflicts.contains(p));
            for item in self.items.iter().filter(|i| i.is_selected() && i.kind.is_addon()) {
                if addon_pair_compatibility(candidate, item.kind, host) == Compatibility::Replaces {
                    conflicts.push(item.kind);
                }
            }
        }

        conflicts
    }

    /// Select `kind`, deselecting whatever the table says it replaces.
    pub fn select(&mut self, kind: LoaderKind) -> LauncherResult<SelectOutcome> {
        let index = self.item_index(kind)?;
        if self.check(kind) == Compatibility::Disallowed {
            return Err(LauncherError::Other(format!(
                "{} cannot be selected for Minecraft {}",
                kind, self.game_version
            )));
        }

        let deselected = self.conflicts_for(kind);
        let mut next = self.items.clone();
        for item in next.iter_mut().filter(|i| deselected.contains(&i.kind)) {
            item.state = ItemState::Unselected;
            item.selected_version = None;
        }

        let target = &mut next[index];
        let needs_versions = !target.has_loaded;
        if target.state == ItemState::Unselected {
            target.state = if target.has_loaded && target.selected_version.is_some() {
                ItemState::Selected
            } else if target.has_loaded && !target.versions.is_empty() {
                target.selected_version = target.versions.first().cloned();
                ItemState::Selected
            } else {
                ItemState::Selecting
            };
        }

        self.items = next;
        if !deselected.is_empty() {
            debug!("Selecting {} deselected {:?}", kind, deselected);
        }

        Ok(SelectOutcome {
            deselected,
            needs_versions,
        })
    }

    /// Clear `kind`. Dropping the primary can leave addons that only
    /// coexisted under it; the first by addon priority stays and the rest
    /// are cleared too. Returns every kind that was cleared.
    pub fn deselect(&mut self, kind: LoaderKind) -> Vec<LoaderKind> {
        if !self.item(kind).is_some_and(ModLoaderItem::is_selected) {
            return Vec::new();
        }
        let mut cleared = vec![kind];

        if kind.is_primary() {
            let mut addons: Vec<LoaderKind> = self
                .items
                .iter()
                .filter(|i| i.is_selected() && i.kind.is_addon())
                .map(|i| i.kind)
                .collect();
            addons.sort_by_key(|k| k.addon_priority());

            let mut kept: Vec<LoaderKind> = Vec::new();
            for addon in addons {
                let fits = kept
                    .iter()
                    .all(|k| addon_pair_compatibility(addon, *k, None) == Compatibility::Allowed);
                if fits {
                    kept.push(addon);
                } else {
                    cleared.push(addon);
                }
            }
        }

        let mut next = self.items.clone();
        for item in next.iter_mut().filter(|i| cleared.contains(&i.kind)) {
            item.state = ItemState::Unselected;
            item.selected_version = None;
        }
        self.items = next;

        if cleared.len() > 1 {
            debug!("Deselecting {} also cleared {:?}", kind, &cleared[1..]);
        }
        cleared
    }

    /// Click handler: selected items are cleared, others selected.
    pub fn toggle(&mut self, kind: LoaderKind) -> LauncherResult<SelectOutcome> {
        if self.item(kind).is_some_and(ModLoaderItem::is_selected) {
            return Ok(SelectOutcome {
                deselected: self.deselect(kind),
                needs_versions: false,
            });
        }
        self.select(kind)
    }

    /// Store a fetched version list; a waiting item picks the first entry.
    pub fn apply_versions(&mut self, kind: LoaderKind, versions: Vec<String>) -> LauncherResult<()> {
        let index = self.item_index(kind)?;
        let item = &mut self.items[index];

        item.versions = versions;
        item.has_loaded = true;

        if let Some(current) = &item.selected_version {
            if !item.versions.contains(current) {
                item.selected_version = None;
            }
        }

        if item.state != ItemState::Unselected {
            if item.selected_version.is_none() {
                item.selected_version = item.versions.first().cloned();
            }
            item.state = if item.selected_version.is_some() {
                ItemState::Selected
            } else {
                ItemState::Selecting
            };
        }
        Ok(())
    }

    pub fn choose_version(&mut self, kind: LoaderKind, version: &str) -> LauncherResult<()> {
        let index = self.item_index(kind)?;
        if !self.items[index].versions.iter().any(|v| v == version) {
            return Err(LauncherError::NotFound(format!("{kind} version {version}")));
        }
        if !self.items[index].is_selected() {
            self.select(kind)?;
        }
        let item = &mut self.items[index];
        item.selected_version = Some(version.to_string());
        item.state = ItemState::Selected;
        Ok(())
    }

    /// Current selection as resolver input.
    pub fn choices(&self) -> Vec<LoaderChoice> {
        self.items
            .iter()
            .filter(|i| i.is_selected())
            .map(|i| LoaderChoice {
                kind: i.kind,
                version: i.selected_version.clone(),
            })
            .collect()
    }

    pub fn plan(&self) -> Result<InstallPlan, ValidationError> {
        resolve(&self.game_version, &self.choices())
    }
}
