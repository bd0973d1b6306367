//! Package installer (spec.md §4.D): for each resolved entry with a tree
//! hash but no directory in any depot, materialize one.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::StoreError;
use crate::{extract, git, locate, url as url_mod};

/// Everything needed to install one resolved package.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub uuid: Uuid,
    pub name: String,
    pub tree_hash: [u8; 20],
    pub package_server: Option<String>,
    pub repo_urls: Vec<String>,
}

fn temp_suffix() -> String {
    let digest = depot_util::hash::sha256_bytes(&std::process::id().to_le_bytes());
    let short: String = digest.chars().take(8).collect();
    format!("{}-{short}", std::process::id())
}

/// Try one tarball URL end-to-end: download, extract, verify the tree hash.
/// Returns the extracted directory on success.
fn try_tarball_url(url: &str, req: &InstallRequest, work_dir: &Path) -> Result<PathBuf, StoreError> {
    let tarball_path = work_dir.join("download.tar.gz");
    let extracted_dir = work_dir.join("extracted");

    depot_util::download::download_with_progress(url, &tarball_path, &req.name, &depot_util::hash::tree_hash_hex(&req.tree_hash))
        .map_err(|e| StoreError::Extract { message: e.to_string() })?;

    extract::extract_tarball(&tarball_path, &extracted_dir)?;

    let actual = depot_util::hash::git_tree_hash(&extracted_dir).map_err(|e| StoreError::Extract { message: e.to_string() })?;
    if actual != req.tree_hash {
        return Err(StoreError::HashMismatch {
            uuid: req.uuid,
            expected: depot_util::hash::tree_hash_hex(&req.tree_hash),
            actual: depot_util::hash::tree_hash_hex(&actual),
            url: url.to_owned(),
        });
    }

    Ok(extracted_dir)
}

/// Fall back to a bare git clone, checked out by tree hash.
fn try_git_fallback(depot_root: &Path, req: &InstallRequest) -> Result<PathBuf, StoreError> {
    let clones_dir = locate::clones_dir(depot_root);
    let mut last_err: Option<StoreError> = None;
    for url in &req.repo_urls {
        match git::clone_or_fetch(&clones_dir, url).and_then(|repo_dir| {
            let dest = repo_dir.join(format!(".checkout-{}", temp_suffix()));
            git::checkout_tree_by_hash(&repo_dir, &req.tree_hash, &dest)?;
            Ok(dest)
        }) {
            Ok(dest) => return Ok(dest),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| StoreError::Git {
        message: "no repo URLs configured".to_owned(),
    }))
}

/// Install one package into `depot_root`, short-circuiting if it is already
/// present.
///
/// # Errors
/// Returns [`StoreError::AllSourcesFailed`] if every tarball URL and the
/// git fallback (if any) fail.
pub fn install_one(depot_root: &Path, req: &InstallRequest) -> Result<PathBuf, StoreError> {
    let final_path = locate::install_path(depot_root, &req.name, req.uuid, &req.tree_hash);
    if final_path.is_dir() {
        return Ok(final_path);
    }

    let _lock = depot_util::lock::PidLock::acquire(&final_path).map_err(|e| StoreError::Io {
        path: final_path.display().to_string(),
        source: std::io::Error::other(e.to_string()),
    })?;

    if final_path.is_dir() {
        return Ok(final_path);
    }

    let tree_hash_hex = depot_util::hash::tree_hash_hex(&req.tree_hash);
    let candidate_urls = url_mod::candidate_urls(
        req.package_server.as_deref(),
        req.uuid,
        &tree_hash_hex,
        &req.repo_urls,
    );

    let work_root = depot_root.join("scratchspaces").join(format!(".install-{}", temp_suffix()));
    depot_util::fs::ensure_dir(&work_root).map_err(|e| StoreError::Io {
        path: work_root.display().to_string(),
        source: std::io::Error::other(e.to_string()),
    })?;

    let mut tried = Vec::new();
    let mut unpacked_dir: Option<PathBuf> = None;

    for (i, candidate) in candidate_urls.iter().enumerate() {
        let attempt_dir = work_root.join(format!("attempt-{i}"));
        match try_tarball_url(candidate, req, &attempt_dir) {
            Ok(dir) => {
                unpacked_dir = Some(dir);
                break;
            }
            Err(e) => tried.push(format!("{candidate}: {e}")),
        }
    }

    if unpacked_dir.is_none() && !req.repo_urls.is_empty() {
        match try_git_fallback(depot_root, req) {
            Ok(dir) => unpacked_dir = Some(dir),
            Err(e) => tried.push(format!("git clone fallback: {e}")),
        }
    }

    let Some(unpacked_dir) = unpacked_dir else {
        let _ = std::fs::remove_dir_all(&work_root);
        return Err(StoreError::AllSourcesFailed {
            uuid: req.uuid,
            tried,
        });
    };

    if let Some(parent) = final_path.parent() {
        depot_util::fs::ensure_dir(parent).map_err(|e| StoreError::Io {
            path: parent.display().to_string(),
            source: std::io::Error::other(e.to_string()),
        })?;
    }

    atomic_move(&unpacked_dir, &final_path)?;
    let _ = std::fs::remove_dir_all(&work_root);

    depot_util::fs::make_readonly_recursive(&final_path).map_err(|e| StoreError::Io {
        path: final_path.display().to_string(),
        source: std::io::Error::other(e.to_string()),
    })?;

    Ok(final_path)
}

/// Rename `from` into `to`, tolerating a concurrent installer that already
/// placed the same content.
fn atomic_move(from: &Path, to: &Path) -> Result<(), StoreError> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) if to.is_dir() => Ok(()),
        Err(source) => Err(StoreError::Io {
            path: to.display().to_string(),
            source,
        }),
    }
}

/// Install every package in `reqs` with bounded fan-out (spec.md §4.D
/// "Concurrency"), returning one result per request in input order.
#[must_use]
pub fn install_all(depot_root: &Path, reqs: &[InstallRequest]) -> Vec<Result<PathBuf, StoreError>> {
    use rayon::prelude::*;

    reqs.par_iter().map(|req| install_one(depot_root, req)).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn already_installed_short_circuits() {
        let tmp = tempfile::tempdir().unwrap();
        let depot_root = tmp.path();
        let uuid = Uuid::from_u128(1);
        let tree_hash = [3u8; 20];
        let path = locate::install_path(depot_root, "Example", uuid, &tree_hash);
        std::fs::create_dir_all(&path).unwrap();

        let req = InstallRequest {
            uuid,
            name: "Example".to_owned(),
            tree_hash,
            package_server: None,
            repo_urls: vec![],
        };

        let result = install_one(depot_root, &req).unwrap();
        assert_eq!(result, path);
    }

    #[test]
    fn no_sources_configured_fails_with_all_sources_failed() {
        let tmp = tempfile::tempdir().unwrap();
        let depot_root = tmp.path();
        let req = InstallRequest {
            uuid: Uuid::from_u128(2),
            name: "Nowhere".to_owned(),
            tree_hash: [9u8; 20],
            package_server: None,
            repo_urls: vec![],
        };

        let result = install_one(depot_root, &req);
        assert!(matches!(result, Err(StoreError::AllSourcesFailed { .. })));
    }
}
