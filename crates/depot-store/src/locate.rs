//! Content-store path layout (spec.md §4 "Content-addressed layout").

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::slug;

/// The install path for a package within a given depot:
/// `<depot>/packages/<Name>/<slug(uuid, tree_hash)>/`.
#[must_use]
pub fn install_path(depot_root: &Path, name: &str, uuid: Uuid, tree_hash: &[u8; 20]) -> PathBuf {
    depot_root.join("packages").join(name).join(slug::slug(uuid, tree_hash))
}

/// The directory holding bare git clones for a depot: `<depot>/clones/`.
#[must_use]
pub fn clones_dir(depot_root: &Path) -> PathBuf {
    depot_root.join("clones")
}
