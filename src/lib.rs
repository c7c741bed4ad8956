pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::content::{ContentKind, ContentPolicy};
pub use crate::core::error::{LauncherError, LauncherResult, ValidationError};
pub use crate::core::loaders::{InstallPlan, LoaderChoice, LoaderKind, LoaderSelector};
pub use crate::core::state::{AppState, SyncSettings};
pub use crate::core::update::{UpdateAction, UpdateSummary};

/// Install the fmt subscriber. Safe to call more than once.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,modsync_lib=debug")),
        )
        .try_init();
}
