// ─── Loader compatibility ───
// One lookup matrix keyed by (candidate, current primary) plus the
// game-version gates that decide which kinds are offered at all.

use super::kind::LoaderKind;

/// Outcome of adding `candidate` next to the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    /// Both stay selected.
    Allowed,
    /// The candidate is never valid here; the selection is refused.
    /// Only the game-version gates produce this.
    Disallowed,
    /// The candidate wins and the conflicting item is deselected.
    Replaces,
}

/// Matrix lookup for a candidate against the currently selected primary.
pub fn compatibility(candidate: LoaderKind, primary: Option<LoaderKind>) -> Compatibility {
    use LoaderKind::*;

    match (candidate, primary) {
        (_, None) => Compatibility::Allowed,
        (c, Some(p)) if c == p => Compatibility::Allowed,
        // Addons only ride on Forge.
        (OptiFine | LiteLoader, Some(Forge)) => Compatibility::Allowed,
        (_, Some(_)) => Compatibility::Replaces,
    }
}

/// Two addons may coexist only when Forge hosts them both.
pub fn addon_pair_compatibility(
    candidate: LoaderKind,
    other: LoaderKind,
    primary: Option<LoaderKind>,
) -> Compatibility {
    if candidate == other {
        return Compatibility::Allowed;
    }
    match primary {
        Some(LoaderKind::Forge) => Compatibility::Allowed,
        _ => Compatibility::Replaces,
    }
}

/// Whether two kinds may appear in the same final plan.
pub fn can_coexist(a: LoaderKind, b: LoaderKind, primary: Option<LoaderKind>) -> bool {
    match (a.is_addon(), b.is_addon()) {
        (true, true) => addon_pair_compatibility(a, b, primary) == Compatibility::Allowed,
        (true, false) => compatibility(a, Some(b)) == Compatibility::Allowed,
        (false, true) => compatibility(b, Some(a)) == Compatibility::Allowed,
        (false, false) => a == b,
    }
}

// ── Game-version gates ──────────────────────────────────

const LITELOADER_VERSIONS: &[&str] = &[
    "1.5.2", "1.6.2", "1.6.4", "1.7.2", "1.7.10", "1.8", "1.8.9", "1.9", "1.9.4", "1.10",
    "1.10.2", "1.11", "1.11.2", "1.12", "1.12.1", "1.12.2",
];

/// Parse the `major.minor` head of a release id. Snapshots yield `None`.
fn major_minor(game_version: &str) -> Option<(u32, u32)> {
    let mut parts = game_version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

pub fn is_offerable(kind: LoaderKind, game_version: &str) -> bool {
    match kind {
        LoaderKind::LegacyFabric => {
            matches!(major_minor(game_version), Some((1, minor)) if minor <= 13)
        }
        LoaderKind::Cleanroom => game_version == "1.12.2",
        LoaderKind::LiteLoader => LITELOADER_VERSIONS.contains(&game_version),
        _ => true,
    }
}

/// Loader kinds the selection screen should show for `game_version`.
pub fn offerable_loaders(game_version: &str) -> Vec<LoaderKind> {
    LoaderKind::ALL
        .into_iter()
        .filter(|kind| is_offerable(*kind, game_version))
        .collect()
}
