mod fs;
mod reconciler;
mod summary;
mod verify;

pub use fs::{ArtifactFs, TokioFs};
pub use reconciler::{UpdateReconciler, NO_COMPATIBLE_CANDIDATE};
pub use summary::{UpdateAction, UpdatePlanEntry, UpdateSummary};
