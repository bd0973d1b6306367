//! `artifact_meta` (spec.md §4.E): select the best-matching platform entry
//! for a named artifact, honoring UUID+name overrides on the way.

use depot_platform::Platform;
use uuid::Uuid;

use crate::overrides::Overrides;
use crate::toml_model::{ArtifactsFile, Entry};

/// A platform entry resolved for use, with any UUID+name override applied
/// to its hash.
#[derive(Debug, Clone)]
pub struct ResolvedEntry {
    pub entry: Entry,
    pub resolved_hash: String,
}

/// Parse `toml`, honor UUID+name overrides, and select the entry matching
/// `platform` (the first in declaration order, per spec.md's
/// "deterministic choice when multiple entries match").
#[must_use]
pub fn artifact_meta(
    name: &str,
    file: &ArtifactsFile,
    platform: &Platform,
    package_uuid: Option<Uuid>,
    overrides: Option<&Overrides>,
) -> Option<ResolvedEntry> {
    let entries = file.get(name)?.entries();
    let chosen = entries
        .iter()
        .find(|e| e.platform().is_none_or(|p| p.matches(platform)))?;

    let mut resolved_hash = chosen.git_tree_sha1.clone();
    if let (Some(uuid), Some(overrides)) = (package_uuid, overrides) {
        if let Some(rewrite) = overrides.by_uuid.get(&uuid).and_then(|names| names.get(name)) {
            resolved_hash.clone_from(rewrite);
        }
    }

    Some(ResolvedEntry {
        entry: chosen.clone(),
        resolved_hash,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::toml_model::parse_artifacts_toml;

    #[test]
    fn picks_matching_platform_entry() {
        let toml = r#"
            [[Lib]]
            os = "linux"
            arch = "x86_64"
            git-tree-sha1 = "linux-hash"

            [[Lib]]
            os = "macos"
            arch = "aarch64"
            git-tree-sha1 = "macos-hash"
        "#;
        let file = parse_artifacts_toml(toml).unwrap();
        let host = Platform::new("macos", "aarch64");
        let resolved = artifact_meta("Lib", &file, &host, None, None).unwrap();
        assert_eq!(resolved.resolved_hash, "macos-hash");
    }

    #[test]
    fn no_matching_platform_returns_none() {
        let toml = r#"
            [[Lib]]
            os = "windows"
            arch = "x86_64"
            git-tree-sha1 = "win-hash"
        "#;
        let file = parse_artifacts_toml(toml).unwrap();
        let host = Platform::new("linux", "x86_64");
        assert!(artifact_meta("Lib", &file, &host, None, None).is_none());
    }

    #[test]
    fn uuid_name_override_rewrites_hash() {
        let toml = r#"
            [Lib]
            git-tree-sha1 = "original-hash"
        "#;
        let file = parse_artifacts_toml(toml).unwrap();
        let host = Platform::new("linux", "x86_64");
        let uuid = Uuid::from_u128(7);

        let mut overrides = Overrides::default();
        let mut names = std::collections::BTreeMap::new();
        names.insert("Lib".to_owned(), "rewritten-hash".to_owned());
        overrides.by_uuid.insert(uuid, names);

        let resolved = artifact_meta("Lib", &file, &host, Some(uuid), Some(&overrides)).unwrap();
        assert_eq!(resolved.resolved_hash, "rewritten-hash");
    }
}
