//! Live-set marking (spec.md §4.F steps 2–4).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use depot_artifact::{artifact_meta, ArtifactsFile, Overrides};
use depot_config::{Manifest, SourceKind};
use depot_platform::Platform;
use uuid::Uuid;

/// Every package install path reachable from `manifest`'s tree-hash entries.
#[must_use]
pub fn live_package_paths(depot_root: &Path, manifest: &Manifest) -> BTreeSet<PathBuf> {
    manifest
        .deps
        .values()
        .filter_map(|entry| match entry.source {
            SourceKind::TreeHash(hash) => Some(depot_store::install_path(depot_root, &entry.name, entry.uuid, &hash)),
            SourceKind::Path(_) | SourceKind::Stdlib => None,
        })
        .collect()
}

/// Every bare-clone directory reachable from a manifest's `repo.source`
/// entries.
#[must_use]
pub fn live_clone_paths(depot_root: &Path, manifest: &Manifest) -> BTreeSet<PathBuf> {
    let clones_dir = depot_store::clones_dir(depot_root);
    manifest
        .deps
        .values()
        .filter_map(|entry| entry.repo.as_ref())
        .map(|repo| clones_dir.join(depot_store::clone_dir_name(&repo.source)))
        .collect()
}

/// Every artifact install path bound for `host` across one package's
/// parsed `Artifacts.toml`.
#[must_use]
pub fn live_artifact_paths(
    depot_root: &Path,
    package_uuid: Uuid,
    file: &ArtifactsFile,
    host: &Platform,
    overrides: Option<&Overrides>,
) -> BTreeSet<PathBuf> {
    file.keys()
        .filter_map(|name| artifact_meta(name, file, host, Some(package_uuid), overrides))
        .map(|resolved| depot_artifact::resolved_artifact_path(depot_root, &resolved.resolved_hash, overrides))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use depot_config::ManifestEntry;

    #[test]
    fn live_package_paths_only_includes_tree_hash_entries() {
        let mut manifest = Manifest::default();
        let uuid = Uuid::from_u128(1);
        manifest
            .deps
            .insert(uuid, ManifestEntry::registry("Example", uuid, semver::Version::new(1, 0, 0), [1u8; 20]));
        let dev_uuid = Uuid::from_u128(2);
        manifest
            .deps
            .insert(dev_uuid, ManifestEntry::dev("Local", dev_uuid, None, "/home/user/local"));

        let depot_root = Path::new("/depot");
        let live = live_package_paths(depot_root, &manifest);
        assert_eq!(live.len(), 1);
    }
}
