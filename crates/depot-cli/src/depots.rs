//! Depot search path resolution and registry loading.
//!
//! The spec names `<depot>/packages`, `<depot>/clones`, `<depot>/artifacts`,
//! `<depot>/environments`, and `<depot>/registries/<source>/<uuid>.toml` as
//! fixed layout under each depot root, but leaves how the search path itself
//! is configured unspecified. We follow the conventional colon-separated
//! `DEPOT_PATH` env var, falling back to a single user depot, the way the
//! teacher's toolchain falls back to a single managed-toolchain home when no
//! override is set.

use std::path::PathBuf;

use crate::error::CliError;

/// The ordered list of depot roots to search, first-to-last priority.
///
/// # Errors
/// Returns an error if no override is set and the user's home directory
/// cannot be determined.
pub fn depot_search_path() -> Result<Vec<PathBuf>, CliError> {
    if let Ok(raw) = std::env::var("DEPOT_PATH") {
        let paths: Vec<PathBuf> = std::env::split_paths(&raw).collect();
        if !paths.is_empty() {
            return Ok(paths);
        }
    }
    Ok(vec![depot_util::fs::depot_home()?])
}

/// Union every configured depot's registered sources under
/// `<depot>/registries/*` into one read-only view.
///
/// # Errors
/// Returns an error if a registry directory exists but cannot be read or a
/// descriptor fails to parse.
pub fn load_registry(depots: &[PathBuf]) -> Result<depot_registry::Registry, CliError> {
    let mut registries = Vec::new();
    for depot in depots {
        let registries_root = depot.join("registries");
        let Ok(entries) = std::fs::read_dir(&registries_root) else {
            continue;
        };
        let mut dirs = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_owned();
                dirs.push((name, path));
            }
        }
        if !dirs.is_empty() {
            registries.push(depot_registry::Registry::from_dirs(&dirs)?);
        }
    }
    Ok(depot_registry::Registry::union(registries))
}

/// `true` if a package's install path already exists in any configured
/// depot.
#[must_use]
pub fn is_installed_anywhere(depots: &[PathBuf], name: &str, uuid: uuid::Uuid, tree_hash: &[u8; 20]) -> bool {
    depots
        .iter()
        .any(|depot| depot_store::install_path(depot, name, uuid, tree_hash).is_dir())
}

/// The first configured depot a package is actually installed in, if any.
#[must_use]
pub fn find_install_path(depots: &[PathBuf], name: &str, uuid: uuid::Uuid, tree_hash: &[u8; 20]) -> Option<PathBuf> {
    depots.iter().map(|depot| depot_store::install_path(depot, name, uuid, tree_hash)).find(|p| p.is_dir())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn load_registry_skips_depots_without_registries_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = load_registry(&[tmp.path().to_path_buf()]).unwrap();
        assert!(registry.lookup(uuid::Uuid::from_u128(1)).unwrap().is_none());
    }

    #[test]
    fn is_installed_anywhere_false_when_absent() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!is_installed_anywhere(&[tmp.path().to_path_buf()], "Example", uuid::Uuid::from_u128(1), &[0u8; 20]));
    }
}
