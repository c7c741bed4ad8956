use std::path::PathBuf;
use thiserror::Error;

use crate::core::loaders::LoaderKind;

/// Central error type for the entire sync backend.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("File is locked by another process: {path:?}")]
    LockedFile { path: PathBuf },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Registry {registry} unavailable: {reason}")]
    RegistryUnavailable { registry: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation cancelled")]
    Cancelled,

    // ── Integrity ───────────────────────────────────────
    #[error("Corrupt download at {path:?}: {reason}")]
    CorruptDownload { path: PathBuf, reason: String },

    // ── Loader ──────────────────────────────────────────
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Loader API unreachable: {0}")]
    LoaderApi(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── XML ─────────────────────────────────────────────
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Settings ────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Errors raised while turning loader selections into an install plan.
/// These are always reported before any network or disk work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No version selected for {kind}")]
    MissingVersionSelection { kind: LoaderKind },

    #[error("{first} cannot be installed together with {second}")]
    ConflictingSelection { first: LoaderKind, second: LoaderKind },

    #[error("{kind} was selected more than once")]
    DuplicateSelection { kind: LoaderKind },

    #[error("Unrecognized {kind} version '{version}'")]
    MalformedVersion { kind: LoaderKind, version: String },
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl LauncherError {
    /// Wrap an I/O error raised while touching `path`, classifying
    /// "file in use" failures as [`LauncherError::LockedFile`].
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if is_lock_error(&source) {
            LauncherError::LockedFile { path }
        } else {
            LauncherError::Io { path, source }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, LauncherError::Cancelled)
    }
}

/// Windows reports a held file as a sharing (32) or lock (33) violation;
/// everywhere else the closest signal is `PermissionDenied`.
fn is_lock_error(error: &std::io::Error) -> bool {
    if matches!(error.raw_os_error(), Some(32) | Some(33)) && cfg!(windows) {
        return true;
    }
    error.kind() == std::io::ErrorKind::PermissionDenied
}

// ── Serialization for the UI layer ──────────────────────
// Callers across an IPC boundary only ever need the message.
impl serde::Serialize for LauncherError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
