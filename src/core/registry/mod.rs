pub mod chain;
pub mod curseforge;
pub mod model;
pub mod modrinth;

use async_trait::async_trait;

pub use chain::{LookupResult, RegistryLookupChain};
pub use curseforge::{CurseForgeRegistry, CURSEFORGE_API};
pub use model::{
    CandidateFile, CandidateIdentity, ContentRegistry, DependencyRef, LookupQuery, RawMatches, RegistryId,
    RegistryMatch,
};
pub use modrinth::{ModrinthRegistry, MODRINTH_API};

use crate::core::content::ContentArtifact;
use crate::core::error::LauncherResult;

/// Dispatcher sin Box<dyn>
pub enum Registry {
    Modrinth(ModrinthRegistry),
    CurseForge(CurseForgeRegistry),
}

#[async_trait]
impl ContentRegistry for Registry {
    fn id(&self) -> RegistryId {
        match self {
            Registry::Modrinth(r) => r.id(),
            Registry::CurseForge(r) => r.id(),
        }
    }

    async fn lookup(
        &self,
        artifacts: &[&ContentArtifact],
        query: &LookupQuery,
    ) -> LauncherResult<RawMatches> {
        match self {
            Registry::Modrinth(r) => r.lookup(artifacts, query).await,
            Registry::CurseForge(r) => r.lookup(artifacts, query).await,
        }
    }

    async fn resolve_dependency(
        &self,
        dependency: &DependencyRef,
        query: &LookupQuery,
    ) -> LauncherResult<Option<RegistryMatch>> {
        match self {
            Registry::Modrinth(r) => r.resolve_dependency(dependency, query).await,
            Registry::CurseForge(r) => r.resolve_dependency(dependency, query).await,
        }
    }
}
