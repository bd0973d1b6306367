//! Bare-clone fallback for packages no tarball URL could serve (spec.md
//! §4.D step 5), grounded on the same `git2` plumbing the wider package
//! manager ecosystem in this ecosystem's ancestry reaches for.

use std::path::{Path, PathBuf};

use crate::error::StoreError;

fn git_err(message: impl std::fmt::Display) -> StoreError {
    StoreError::Git {
        message: message.to_string(),
    }
}

/// One bare clone per distinct URL, named by a hash of the URL so repeat
/// installs from the same repo reuse the same clone.
#[must_use]
pub fn clone_dir_name(url: &str) -> String {
    depot_util::hash::sha256_bytes(url.as_bytes())
        .chars()
        .take(16)
        .collect()
}

/// Ensure a bare clone of `url` exists under `<depot>/clones/`, fetching
/// updates if it already does, and return its path.
///
/// # Errors
/// Returns an error if the clone cannot be created or fetched.
pub fn clone_or_fetch(clones_dir: &Path, url: &str) -> Result<PathBuf, StoreError> {
    depot_util::fs::ensure_dir(clones_dir).map_err(|e| git_err(e.to_string()))?;
    let repo_dir = clones_dir.join(clone_dir_name(url));

    if repo_dir.is_dir() {
        let repo = git2::Repository::open_bare(&repo_dir).map_err(git_err)?;
        fetch_all_refs(&repo, url)?;
    } else {
        let repo = git2::Repository::init_bare(&repo_dir).map_err(git_err)?;
        fetch_all_refs(&repo, url)?;
    }

    Ok(repo_dir)
}

fn fetch_all_refs(repo: &git2::Repository, url: &str) -> Result<(), StoreError> {
    let mut remote = repo.remote_anonymous(url).map_err(git_err)?;
    remote
        .fetch(
            &["+refs/heads/*:refs/heads/*", "+refs/tags/*:refs/tags/*"],
            None,
            None,
        )
        .map_err(git_err)?;
    Ok(())
}

/// Check out the tree object identified by `tree_hash` from a bare clone
/// into `dest`.
///
/// # Errors
/// Returns an error if the tree object is absent from the clone or the
/// checkout fails.
pub fn checkout_tree_by_hash(repo_dir: &Path, tree_hash: &[u8; 20], dest: &Path) -> Result<(), StoreError> {
    let repo = git2::Repository::open(repo_dir).map_err(git_err)?;
    let oid = git2::Oid::from_bytes(tree_hash).map_err(git_err)?;
    let tree = repo.find_tree(oid).map_err(git_err)?;

    depot_util::fs::ensure_dir(dest).map_err(|e| git_err(e.to_string()))?;
    let mut checkout = git2::build::CheckoutBuilder::new();
    checkout.target_dir(dest).force();
    repo.checkout_tree(tree.as_object(), Some(&mut checkout))
        .map_err(git_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_dir_name_is_deterministic() {
        assert_eq!(
            clone_dir_name("https://github.com/owner/repo.git"),
            clone_dir_name("https://github.com/owner/repo.git")
        );
    }

    #[test]
    fn clone_dir_name_differs_by_url() {
        assert_ne!(
            clone_dir_name("https://github.com/owner/repo.git"),
            clone_dir_name("https://github.com/owner/other.git")
        );
    }
}
