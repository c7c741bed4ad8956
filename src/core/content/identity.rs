use std::path::Path;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::core::error::{LauncherError, LauncherResult};

/// Both identities of one file: the SHA-1 Modrinth indexes by and the
/// CurseForge fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentIdentity {
    pub sha1: String,
    pub fingerprint: u32,
}

impl ContentIdentity {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self {
            sha1: sha1_hex(bytes),
            fingerprint: fingerprint(bytes),
        }
    }
}

/// Read `path` once and compute both identities.
pub async fn compute_identity(path: &Path) -> LauncherResult<ContentIdentity> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| LauncherError::from_io(path, e))?;
    Ok(ContentIdentity::of_bytes(&bytes))
}

pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn sha512_hex(bytes: &[u8]) -> String {
    let mut hasher = sha2::Sha512::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

// ── CurseForge fingerprint ──────────────────────────────
// MurmurHash2 (seed 1) over the file with tab, LF, CR and space removed.
// The length mixed into the seed is the length after stripping.

const MURMUR_M: u32 = 0x5bd1_e995;
const MURMUR_R: u32 = 24;
const FINGERPRINT_SEED: u32 = 1;

fn is_fingerprint_whitespace(b: u8) -> bool {
    matches!(b, 9 | 10 | 13 | 32)
}

pub fn fingerprint(bytes: &[u8]) -> u32 {
    let normalized: Vec<u8> = bytes
        .iter()
        .copied()
        .filter(|b| !is_fingerprint_whitespace(*b))
        .collect();

    let mut h = FINGERPRINT_SEED ^ (normalized.len() as u32);

    let mut chunks = normalized.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(MURMUR_M);
        k ^= k >> MURMUR_R;
        k = k.wrapping_mul(MURMUR_M);
        h = h.wrapping_mul(MURMUR_M);
        h ^= k;
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        if tail.len() >= 3 {
            h ^= (tail[2] as u32) << 16;
        }
        if tail.len() >= 2 {
            h ^= (tail[1] as u32) << 8;
        }
        h ^= tail[0] as u32;
        h = h.wrapping_mul(MURMUR_M);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(MURMUR_M);
    h ^= h >> 15;
    h
}
