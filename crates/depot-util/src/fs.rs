//! Filesystem utilities shared by the store, artifact, and gc crates.

use std::path::{Path, PathBuf};

use crate::error::UtilError;

/// Create a directory and all parent directories if they do not exist.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<(), UtilError> {
    std::fs::create_dir_all(path).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Copy `src` to `dest`, preferring a hard link for speed.
///
/// Falls back to a regular copy if hard linking fails (e.g. cross-device).
///
/// # Errors
/// Returns an error if both hard linking and copying fail.
pub fn materialize(src: &Path, dest: &Path) -> Result<(), UtilError> {
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }

    if dest.exists() {
        std::fs::remove_file(dest).map_err(|source| UtilError::Io {
            path: dest.display().to_string(),
            source,
        })?;
    }

    if std::fs::hard_link(src, dest).is_err() {
        std::fs::copy(src, dest).map_err(|source| UtilError::Io {
            path: dest.display().to_string(),
            source,
        })?;
    }

    Ok(())
}

/// Recursively hard-link (falling back to copy) every entry of `src` into `dest`.
///
/// Used to materialize a content-store package directory into a fresh
/// install path without re-reading the source from the network.
///
/// # Errors
/// Returns an error if any entry cannot be read, linked, or copied.
pub fn materialize_tree(src: &Path, dest: &Path) -> Result<(), UtilError> {
    ensure_dir(dest)?;
    let entries = std::fs::read_dir(src).map_err(|source| UtilError::Io {
        path: src.display().to_string(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| UtilError::Io {
            path: src.display().to_string(),
            source,
        })?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        let file_type = entry.file_type().map_err(|source| UtilError::Io {
            path: from.display().to_string(),
            source,
        })?;
        if file_type.is_dir() {
            materialize_tree(&from, &to)?;
        } else {
            materialize(&from, &to)?;
        }
    }
    Ok(())
}

/// Remove a directory and all its contents. No error if the directory is absent.
///
/// Clears read-only permissions first, since content-store entries are
/// deliberately made read-only after install.
///
/// # Errors
/// Returns an error if the directory exists but cannot be removed.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<(), UtilError> {
    let _ = make_writable_recursive(path);
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(UtilError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Best-effort: walk `path` and clear the read-only bit on every entry.
///
/// Never fails loudly — callers that need deletion to succeed should still
/// check the result of the subsequent removal.
fn make_writable_recursive(path: &Path) -> std::io::Result<()> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(_) => return Ok(()),
    };
    if meta.is_dir() {
        for entry in (std::fs::read_dir(path)?).flatten() {
            let _ = make_writable_recursive(&entry.path());
        }
    }
    let mut perm = meta.permissions();
    #[allow(clippy::permissions_set_readonly_false)]
    perm.set_readonly(false);
    std::fs::set_permissions(path, perm)
}

/// Set a directory tree read-only, matching the content store's
/// immutable-after-move convention.
///
/// # Errors
/// Returns an error if permissions cannot be changed on any entry.
pub fn make_readonly_recursive(path: &Path) -> Result<(), UtilError> {
    let meta = std::fs::symlink_metadata(path).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })?;
    if meta.is_dir() {
        let entries = std::fs::read_dir(path).map_err(|source| UtilError::Io {
            path: path.display().to_string(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| UtilError::Io {
                path: path.display().to_string(),
                source,
            })?;
            make_readonly_recursive(&entry.path())?;
        }
    }
    let mut perm = meta.permissions();
    perm.set_readonly(true);
    std::fs::set_permissions(path, perm).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Return the depot home directory (`~/.depot`).
///
/// Resolves via `HOME` (Unix) or `USERPROFILE` (Windows).
///
/// # Errors
/// Returns an error if neither environment variable is set.
pub fn depot_home() -> Result<PathBuf, UtilError> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .map_err(|_| UtilError::NoHomeDir)?;
    Ok(home.join(".depot"))
}

/// Atomically write `contents` to `path`: write a sibling `.tmp`, then rename.
///
/// # Errors
/// Returns an error if either the temp write or the rename fails.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), UtilError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let pid = std::process::id();
    let tmp_name = format!(
        ".tmp-{}-{pid}",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("depot")
    );
    let tmp_path = path
        .parent()
        .map(|p| p.join(&tmp_name))
        .unwrap_or_else(|| PathBuf::from(&tmp_name));

    std::fs::write(&tmp_path, contents).map_err(|source| UtilError::Io {
        path: tmp_path.display().to_string(),
        source,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn ensure_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b").join("c");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn materialize_hardlink() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src.txt");
        let dest = tmp.path().join("dest.txt");
        fs::write(&src, b"data").unwrap();

        materialize(&src, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"data");
    }

    #[test]
    fn materialize_tree_copies_nested_structure() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("a.txt"), b"A").unwrap();
        fs::write(src.join("sub").join("b.txt"), b"B").unwrap();

        let dest = tmp.path().join("dest");
        materialize_tree(&src, &dest).unwrap();

        assert_eq!(fs::read(dest.join("a.txt")).unwrap(), b"A");
        assert_eq!(fs::read(dest.join("sub").join("b.txt")).unwrap(), b"B");
    }

    #[test]
    fn remove_dir_all_if_exists_removes_readonly_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("target");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("file.txt"), b"x").unwrap();
        make_readonly_recursive(&dir).unwrap();

        remove_dir_all_if_exists(&dir).unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn remove_dir_all_if_exists_absent_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nonexistent");
        remove_dir_all_if_exists(&dir).unwrap();
    }

    #[test]
    fn write_atomic_leaves_no_tmp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.toml");
        write_atomic(&path, b"hello = true").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello = true");

        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn make_readonly_recursive_sets_mode() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("a.txt");
        fs::write(&file, b"x").unwrap();
        make_readonly_recursive(tmp.path()).unwrap();
        let mode = fs::metadata(&file).unwrap().permissions().mode();
        assert_eq!(mode & 0o200, 0);
    }
}
