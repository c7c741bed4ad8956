pub mod compatibility;
pub mod kind;
pub mod resolver;
pub mod selector;
pub mod source;
pub mod versions;

mod fabric;
mod forge;
mod liteloader;
mod optifine;

pub use compatibility::{compatibility, is_offerable, offerable_loaders, Compatibility};
pub use kind::LoaderKind;
pub use resolver::{resolve, InstallPlan, LoaderChoice, LoaderSelection};
pub use selector::{ItemState, LoaderSelector, ModLoaderItem, SelectOutcome};
pub use source::{HttpVersionSource, LoaderEndpoints, VersionSource};
pub use versions::VersionLoaderCache;
