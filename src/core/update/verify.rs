use std::io::Cursor;
use std::path::Path;

use crate::core::content::{fingerprint, sha1_hex, sha512_hex};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::registry::{CandidateFile, CandidateIdentity};

/// Check a finished download against everything the registry told us.
pub(crate) async fn verify_download(path: &Path, candidate: &CandidateFile) -> LauncherResult<()> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| LauncherError::from_io(path, e))?;
    verify_bytes(path, &bytes, candidate)
}

fn verify_bytes(path: &Path, bytes: &[u8], candidate: &CandidateFile) -> LauncherResult<()> {
    let corrupt = |reason: String| LauncherError::CorruptDownload {
        path: path.to_path_buf(),
        reason,
    };

    if bytes.is_empty() {
        return Err(corrupt("empty file".into()));
    }

    if let Some(size) = candidate.size {
        if size != bytes.len() as u64 {
            return Err(corrupt(format!("expected {size} bytes, got {}", bytes.len())));
        }
    }

    let expected_sha1 = candidate.sha1.as_deref().or(match &candidate.identity {
        CandidateIdentity::Sha1(h) => Some(h.as_str()),
        CandidateIdentity::Fingerprint(_) => None,
    });
    if let Some(expected) = expected_sha1 {
        let actual = sha1_hex(bytes);
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(corrupt(format!("SHA-1 mismatch: expected {expected}, got {actual}")));
        }
    }

    if let Some(expected) = candidate.sha512.as_deref() {
        let actual = sha512_hex(bytes);
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(corrupt("SHA-512 mismatch".into()));
        }
    }

    if let CandidateIdentity::Fingerprint(expected) = candidate.identity {
        let actual = fingerprint(bytes);
        if actual != expected {
            return Err(corrupt(format!("fingerprint mismatch: expected {expected}, got {actual}")));
        }
    }

    if is_archive(&candidate.file_name) {
        zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| corrupt(format!("unreadable archive: {e}")))?;
    }

    Ok(())
}

fn is_archive(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jar") || e.eq_ignore_ascii_case("zip"))
}

/// Only a bare file name may come from a registry.
pub(crate) fn validate_file_name(file_name: &str) -> LauncherResult<()> {
    let bad = file_name.is_empty()
        || file_name == "."
        || file_name.contains("..")
        || file_name.contains('/')
        || file_name.contains('\\')
        || file_name.contains(':');
    if bad {
        return Err(LauncherError::Other(format!(
            "Refusing unsafe file name from registry: {file_name:?}"
        )));
    }
    Ok(())
}
