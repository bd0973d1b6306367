//! Artifact content store (spec.md §4.E "Operations" — `create_artifact`
//! and `ensure_installed`). Separately content-addressed from packages,
//! living at `<depot>/artifacts/<hex tree hash>/`.

use std::path::{Path, PathBuf};

use crate::error::ArtifactError;
use crate::overrides::{resolve_hash_override, Overrides, ResolvedOverride};
use crate::toml_model::Entry;

fn temp_suffix() -> String {
    let digest = depot_util::hash::sha256_bytes(&std::process::id().to_le_bytes());
    let short: String = digest.chars().take(8).collect();
    format!("{}-{short}", std::process::id())
}

/// The install path for an artifact with hash `hash_hex`, ignoring
/// overrides.
#[must_use]
pub fn artifact_path(depot_root: &Path, hash_hex: &str) -> PathBuf {
    depot_root.join("artifacts").join(hash_hex)
}

/// Resolve the path an artifact with `hash_hex` should live at, following
/// any by-hash override chain first.
#[must_use]
pub fn resolved_artifact_path(depot_root: &Path, hash_hex: &str, overrides: Option<&Overrides>) -> PathBuf {
    match overrides {
        None => artifact_path(depot_root, hash_hex),
        Some(overrides) => match resolve_hash_override(overrides, hash_hex) {
            ResolvedOverride::Hash(hash) => artifact_path(depot_root, &hash),
            ResolvedOverride::Path(path) => PathBuf::from(path),
        },
    }
}

/// Build an artifact by calling `f` with a fresh scratch directory, then
/// move its contents into the store if not already present.
///
/// The store is immutable: if an entry already exists at the computed
/// hash, `f`'s output is discarded rather than re-written.
///
/// # Errors
/// Returns an error if `f` fails, the tree cannot be hashed, or the move
/// into the store fails.
pub fn create_artifact<F>(depot_root: &Path, f: F) -> Result<[u8; 20], ArtifactError>
where
    F: FnOnce(&Path) -> Result<(), ArtifactError>,
{
    let scratch = depot_root.join("scratchspaces").join(format!(".artifact-{}", temp_suffix()));
    depot_util::fs::ensure_dir(&scratch)?;

    f(&scratch)?;

    let hash = depot_util::hash::git_tree_hash(&scratch)?;
    let hash_hex = depot_util::hash::tree_hash_hex(&hash);
    let dest = artifact_path(depot_root, &hash_hex);

    if dest.is_dir() {
        let _ = std::fs::remove_dir_all(&scratch);
        return Ok(hash);
    }

    if let Some(parent) = dest.parent() {
        depot_util::fs::ensure_dir(parent)?;
    }
    match std::fs::rename(&scratch, &dest) {
        Ok(()) => {}
        Err(_) if dest.is_dir() => {
            let _ = std::fs::remove_dir_all(&scratch);
        }
        Err(source) => {
            return Err(ArtifactError::Io {
                path: dest.display().to_string(),
                source,
            });
        }
    }
    depot_util::fs::make_readonly_recursive(&dest)?;

    Ok(hash)
}

/// Ensure the artifact described by `entry`/`resolved_hash` is present on
/// disk, downloading it if necessary (spec.md §4.E `ensure_installed`).
///
/// Tries the package server URL first, then each `download.url` entry in
/// order; verifies the tarball's SHA-256 (when known) and the unpacked
/// tree's git-tree hash before moving it into the store.
///
/// # Errors
/// Returns [`ArtifactError::AllSourcesFailed`] if every source fails.
pub fn ensure_installed(
    depot_root: &Path,
    entry: &Entry,
    resolved_hash: &str,
    package_server: Option<&str>,
    overrides: Option<&Overrides>,
) -> Result<PathBuf, ArtifactError> {
    let final_path = resolved_artifact_path(depot_root, resolved_hash, overrides);
    if final_path.is_dir() {
        return Ok(final_path);
    }

    let mut candidates: Vec<(String, Option<String>)> = Vec::new();
    if let Some(server) = package_server {
        let server = server.trim_end_matches('/');
        candidates.push((format!("{server}/artifact/{resolved_hash}"), None));
    }
    for source in &entry.download {
        candidates.push((source.url.clone(), Some(source.sha256.clone())));
    }

    let expected_tree_hash = depot_util::hash::parse_tree_hash(resolved_hash);

    let scratch = depot_root.join("scratchspaces").join(format!(".artifact-{}", temp_suffix()));
    depot_util::fs::ensure_dir(&scratch)?;

    let mut tried = Vec::new();
    let mut unpacked: Option<PathBuf> = None;

    for (i, (url, expected_sha256)) in candidates.iter().enumerate() {
        let attempt_dir = scratch.join(format!("attempt-{i}"));
        let tarball_path = attempt_dir.join("download.tar.gz");
        let extracted_dir = attempt_dir.join("extracted");

        let attempt = depot_util::download::download_with_progress(url, &tarball_path, "artifact", resolved_hash)
            .map_err(ArtifactError::Util)
            .and_then(|actual_sha256| {
                if let Some(expected) = expected_sha256 {
                    if &actual_sha256 != expected {
                        return Err(ArtifactError::HashMismatch {
                            expected: expected.clone(),
                            actual: actual_sha256,
                            url: url.clone(),
                        });
                    }
                }
                Ok(())
            })
            .and_then(|()| depot_store::extract::extract_tarball(&tarball_path, &extracted_dir).map_err(ArtifactError::Store))
            .and_then(|()| {
                if let Some(expected) = expected_tree_hash {
                    let actual = depot_util::hash::git_tree_hash(&extracted_dir)?;
                    if actual != expected {
                        return Err(ArtifactError::HashMismatch {
                            expected: resolved_hash.to_owned(),
                            actual: depot_util::hash::tree_hash_hex(&actual),
                            url: url.clone(),
                        });
                    }
                }
                Ok(())
            });

        match attempt {
            Ok(()) => {
                unpacked = Some(extracted_dir);
                break;
            }
            Err(e) => tried.push(format!("{url}: {e}")),
        }
    }

    let Some(unpacked) = unpacked else {
        let _ = std::fs::remove_dir_all(&scratch);
        return Err(ArtifactError::AllSourcesFailed {
            hash: resolved_hash.to_owned(),
            tried,
        });
    };

    if let Some(parent) = final_path.parent() {
        depot_util::fs::ensure_dir(parent)?;
    }
    match std::fs::rename(&unpacked, &final_path) {
        Ok(()) => {}
        Err(_) if final_path.is_dir() => {}
        Err(source) => {
            return Err(ArtifactError::Io {
                path: final_path.display().to_string(),
                source,
            });
        }
    }
    let _ = std::fs::remove_dir_all(&scratch);
    depot_util::fs::make_readonly_recursive(&final_path)?;

    Ok(final_path)
}
