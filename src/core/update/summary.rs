use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::core::registry::RegistryId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateAction {
    /// Already the newest compatible file.
    NoOp,
    /// Replaced by the candidate.
    Replace,
    /// Left as is; `error_detail` says why.
    Unresolvable,
    /// Newly fetched because a replaced file requires it.
    AddDependency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlanEntry {
    pub artifact: PathBuf,
    pub action: UpdateAction,
    pub source_registry: Option<RegistryId>,
    pub error_detail: Option<String>,
    /// Where the replacement landed, for `Replace`.
    pub new_path: Option<PathBuf>,
}

impl UpdatePlanEntry {
    pub fn no_op(artifact: PathBuf, registry: RegistryId) -> Self {
        Self {
            artifact,
            action: UpdateAction::NoOp,
            source_registry: Some(registry),
            error_detail: None,
            new_path: None,
        }
    }

    pub fn replaced(artifact: PathBuf, registry: RegistryId, new_path: PathBuf) -> Self {
        Self {
            artifact,
            action: UpdateAction::Replace,
            source_registry: Some(registry),
            error_detail: None,
            new_path: Some(new_path),
        }
    }

    pub fn dependency(path: PathBuf, registry: RegistryId) -> Self {
        Self {
            artifact: path.clone(),
            action: UpdateAction::AddDependency,
            source_registry: Some(registry),
            error_detail: None,
            new_path: Some(path),
        }
    }

    pub fn unresolvable(
        artifact: PathBuf,
        registry: Option<RegistryId>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            artifact,
            action: UpdateAction::Unresolvable,
            source_registry: registry,
            error_detail: Some(detail.into()),
            new_path: None,
        }
    }
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    pub updated: usize,
    pub up_to_date: usize,
    pub unresolved: usize,
    pub dependencies_added: usize,
    pub entries: Vec<UpdatePlanEntry>,
}

impl UpdateSummary {
    /// Entries are kept sorted by artifact path.
    pub fn from_entries(mut entries: Vec<UpdatePlanEntry>) -> Self {
        entries.sort_by(|a, b| a.artifact.cmp(&b.artifact));
        let count = |action: UpdateAction| entries.iter().filter(|e| e.action == action).count();
        Self {
            updated: count(UpdateAction::Replace),
            up_to_date: count(UpdateAction::NoOp),
            unresolved: count(UpdateAction::Unresolvable),
            dependencies_added: count(UpdateAction::AddDependency),
            entries,
        }
    }

    pub fn entry(&self, artifact: &std::path::Path) -> Option<&UpdatePlanEntry> {
        self.entries.iter().find(|e| e.artifact == artifact)
    }
}

impl fmt::Display for UpdateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} updated, {} up-to-date, {} unresolved",
            self.updated, self.up_to_date, self.unresolved
        )?;
        if self.dependencies_added > 0 {
            write!(f, ", {} dependencies added", self.dependencies_added)?;
        }
        Ok(())
    }
}
