// ─── Loader composition ───
// Pure function from UI-level choices to an ordered, validated plan.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::compatibility::can_coexist;
use super::kind::LoaderKind;
use crate::core::error::ValidationError;

/// A loader as chosen on the selection screen, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderChoice {
    pub kind: LoaderKind,
    pub version: Option<String>,
}

impl LoaderChoice {
    pub fn new(kind: LoaderKind, version: impl Into<String>) -> Self {
        Self {
            kind,
            version: Some(version.into()),
        }
    }

    pub fn unversioned(kind: LoaderKind) -> Self {
        Self {
            kind,
            version: None,
        }
    }
}

/// One step of the installation handed to the installer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderSelection {
    #[serde(rename = "type")]
    pub kind: LoaderKind,
    pub version: String,
    pub install_order: u32,
    pub is_addon: bool,
}

/// Ordered list of loader installs; orders run 1..=n without gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallPlan {
    pub game_version: String,
    pub entries: Vec<LoaderSelection>,
}

impl InstallPlan {
    pub fn is_vanilla(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn primary(&self) -> Option<&LoaderSelection> {
        self.entries.iter().find(|e| e.kind.is_primary())
    }

    /// Combined version id, e.g. `forge-1.20.1-47.2.0-optifine-HD_U_I6`.
    /// A non-empty custom name always wins.
    pub fn version_id(&self, custom_name: Option<&str>) -> String {
        if let Some(name) = custom_name.filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        if self.entries.is_empty() {
            return self.game_version.clone();
        }

        let mut parts = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let version = entry.version.replace(':', "_");
            if parts.is_empty() {
                parts.push(format!("{}-{}-{}", entry.kind.id(), self.game_version, version));
            } else {
                parts.push(format!("{}-{}", entry.kind.id(), version));
            }
        }
        parts.join("-")
    }
}

/// Validate `choices` for `game_version` and produce the ordered plan.
///
/// Conflicts are checked first, then versions; nothing here touches the
/// network or the disk.
pub fn resolve(game_version: &str, choices: &[LoaderChoice]) -> Result<InstallPlan, ValidationError> {
    check_duplicates(choices)?;

    let primaries: Vec<&LoaderChoice> = choices.iter().filter(|c| c.kind.is_primary()).collect();
    if let [first, second, ..] = primaries.as_slice() {
        return Err(ValidationError::ConflictingSelection {
            first: first.kind,
            second: second.kind,
        });
    }
    let primary = primaries.first().map(|c| c.kind);

    for (i, a) in choices.iter().enumerate() {
        for b in &choices[i + 1..] {
            if !can_coexist(a.kind, b.kind, primary) {
                return Err(ValidationError::ConflictingSelection {
                    first: a.kind,
                    second: b.kind,
                });
            }
        }
    }

    let mut ordered: Vec<&LoaderChoice> = choices.iter().collect();
    ordered.sort_by_key(|c| (c.kind.is_addon(), c.kind.addon_priority()));

    let mut entries = Vec::with_capacity(ordered.len());
    for (index, choice) in ordered.into_iter().enumerate() {
        let raw = choice
            .version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ValidationError::MissingVersionSelection { kind: choice.kind })?;

        let version = normalize_version(choice.kind, game_version, raw)?;
        entries.push(LoaderSelection {
            kind: choice.kind,
            version,
            install_order: index as u32 + 1,
            // Standalone addons are installed as the base of the version.
            is_addon: choice.kind.is_addon() && primary.is_some(),
        });
    }

    debug!(
        "Resolved plan for {}: {}",
        game_version,
        entries
            .iter()
            .map(|e| format!("{}#{} {}", e.kind, e.install_order, e.version))
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(InstallPlan {
        game_version: game_version.to_string(),
        entries,
    })
}

fn check_duplicates(choices: &[LoaderChoice]) -> Result<(), ValidationError> {
    for (i, choice) in choices.iter().enumerate() {
        if choices[..i].iter().any(|c| c.kind == choice.kind) {
            return Err(ValidationError::DuplicateSelection { kind: choice.kind });
        }
    }
    Ok(())
}

/// Bring a UI version string into the form the installer expects.
fn normalize_version(
    kind: LoaderKind,
    game_version: &str,
    raw: &str,
) -> Result<String, ValidationError> {
    match kind {
        LoaderKind::OptiFine => normalize_optifine(game_version, raw).ok_or_else(|| {
            ValidationError::MalformedVersion {
                kind,
                version: raw.to_string(),
            }
        }),
        _ => Ok(raw.to_string()),
    }
}

/// `1.20.1_HD_U_I6` / `HD_U_I6` -> `HD_U:I6`. Already-normalized input passes.
///
/// The patch starts at the first token shaped like `I6` so suffixes such as
/// `_pre1` stay with it: `HD_U_I6_pre1` -> `HD_U:I6_pre1`.
fn normalize_optifine(game_version: &str, raw: &str) -> Option<String> {
    if raw.contains(':') {
        return Some(raw.to_string());
    }
    let without_game = raw
        .strip_prefix(game_version)
        .and_then(|rest| rest.strip_prefix('_'))
        .unwrap_or(raw);

    let tokens: Vec<&str> = without_game.split('_').collect();
    let (edition, patch) = match tokens.iter().skip(1).position(|t| is_patch_token(t)) {
        Some(at) => (tokens[..=at].join("_"), tokens[at + 1..].join("_")),
        None => {
            let (edition, patch) = without_game.rsplit_once('_')?;
            (edition.to_string(), patch.to_string())
        }
    };
    if edition.is_empty() || patch.is_empty() {
        return None;
    }
    Some(format!("{edition}:{patch}"))
}

fn is_patch_token(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(digit)) if letter.is_ascii_uppercase() && digit.is_ascii_digit()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use LoaderKind::*;

    fn assert_contiguous(plan: &InstallPlan) {
        let orders: Vec<u32> = plan.entries.iter().map(|e| e.install_order).collect();
        let expected: Vec<u32> = (1..=plan.entries.len() as u32).collect();
        assert_eq!(orders, expected);
    }

    #[test]
    fn forge_with_optifine_addon() {
        let plan = resolve(
            "1.20.1",
            &[
                LoaderChoice::new(OptiFine, "1.20.1_HD_U_I6"),
                LoaderChoice::new(Forge, "47.2.0"),
            ],
        )
        .unwrap();

        assert_eq!(
            plan.entries,
            vec![
                LoaderSelection {
                    kind: Forge,
                    version: "47.2.0".into(),
                    install_order: 1,
                    is_addon: false,
                },
                LoaderSelection {
                    kind: OptiFine,
                    version: "HD_U:I6".into(),
                    install_order: 2,
                    is_addon: true,
                },
            ]
        );
        assert_eq!(plan.version_id(None), "forge-1.20.1-47.2.0-optifine-HD_U_I6");
    }

    #[test]
    fn standalone_liteloader_takes_first_slot() {
        let plan = resolve("1.8.9", &[LoaderChoice::new(LiteLoader, "1.8.9-SNAPSHOT")]).unwrap();
        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].install_order, 1);
        assert!(!plan.entries[0].is_addon);
    }

    #[test]
    fn forge_hosts_both_addons_in_priority_order() {
        let plan = resolve(
            "1.12.2",
            &[
                LoaderChoice::new(LiteLoader, "1.12.2-SNAPSHOT"),
                LoaderChoice::new(OptiFine, "HD_U_G5"),
                LoaderChoice::new(Forge, "14.23.5.2860"),
            ],
        )
        .unwrap();
        let kinds: Vec<_> = plan.entries.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![Forge, OptiFine, LiteLoader]);
        assert_contiguous(&plan);
    }

    #[test]
    fn addons_without_forge_conflict() {
        let err = resolve(
            "1.12.2",
            &[LoaderChoice::new(OptiFine, "HD_U_G5"), LoaderChoice::new(LiteLoader, "x")],
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::ConflictingSelection { .. }));

        let err = resolve(
            "1.20.1",
            &[LoaderChoice::new(Fabric, "0.15.0"), LoaderChoice::new(OptiFine, "HD_U_I6")],
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::ConflictingSelection { .. }));
    }

    #[test]
    fn two_primaries_conflict() {
        let err = resolve(
            "1.20.1",
            &[LoaderChoice::new(Fabric, "0.15.0"), LoaderChoice::new(Quilt, "0.23.0")],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::ConflictingSelection {
                first: Fabric,
                second: Quilt
            }
        );
    }

    #[test]
    fn missing_version_is_rejected() {
        let err = resolve(
            "1.20.1",
            &[LoaderChoice::new(Forge, "47.2.0"), LoaderChoice::unversioned(OptiFine)],
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::MissingVersionSelection { kind: OptiFine });

        let err = resolve("1.20.1", &[LoaderChoice::new(Fabric, "  ")]).unwrap_err();
        assert_eq!(err, ValidationError::MissingVersionSelection { kind: Fabric });
    }

    #[test]
    fn duplicate_kind_is_rejected() {
        let err = resolve(
            "1.20.1",
            &[LoaderChoice::new(Forge, "47.2.0"), LoaderChoice::new(Forge, "47.1.0")],
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateSelection { kind: Forge });
    }

    #[test]
    fn malformed_optifine_version_is_rejected() {
        let err = resolve("1.20.1", &[LoaderChoice::new(OptiFine, "latest")]).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedVersion { .. }));
    }

    #[test]
    fn empty_selection_is_vanilla() {
        let plan = resolve("1.20.1", &[]).unwrap();
        assert!(plan.is_vanilla());
        assert_eq!(plan.version_id(None), "1.20.1");
        assert_eq!(plan.version_id(Some("My Pack")), "My Pack");
    }

    #[test]
    fn every_valid_plan_has_contiguous_orders() {
        let candidates = [
            vec![LoaderChoice::new(Fabric, "0.15.0")],
            vec![LoaderChoice::new(OptiFine, "HD_U_I6")],
            vec![LoaderChoice::new(Forge, "1"), LoaderChoice::new(LiteLoader, "2")],
            vec![
                LoaderChoice::new(LiteLoader, "2"),
                LoaderChoice::new(Forge, "1"),
                LoaderChoice::new(OptiFine, "HD_U_I6"),
            ],
        ];
        for choices in candidates {
            let plan = resolve("1.12.2", &choices).unwrap();
            assert_contiguous(&plan);
            if let Some(primary) = plan.primary() {
                assert_eq!(primary.install_order, 1);
            }
        }
    }

    #[test]
    fn optifine_prerelease_keeps_its_suffix() {
        let plan = resolve(
            "1.20.1",
            &[
                LoaderChoice::new(Forge, "47.2.0"),
                LoaderChoice::new(OptiFine, "1.20.1_HD_U_I6_pre1"),
            ],
        )
        .unwrap();
        assert_eq!(plan.entries[1].version, "HD_U:I6_pre1");
        assert_eq!(plan.version_id(None), "forge-1.20.1-47.2.0-optifine-HD_U_I6_pre1");

        assert_eq!(normalize_optifine("1.12.2", "HD_U_G5").as_deref(), Some("HD_U:G5"));
        assert_eq!(normalize_optifine("1.8.9", "HD_U_M5_pre2").as_deref(), Some("HD_U:M5_pre2"));
        assert_eq!(normalize_optifine("1.20.1", "HD_U:I6_pre1").as_deref(), Some("HD_U:I6_pre1"));
        assert_eq!(normalize_optifine("1.20.1", "_I6"), None);
    }
}
