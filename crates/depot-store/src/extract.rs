//! Path-traversal-safe tarball extraction (spec.md §4.D step 3).

use std::path::Path;

use crate::error::StoreError;

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Extract a gzip-compressed tarball into `dest`, rejecting any entry
/// whose path would escape `dest`.
///
/// # Errors
/// Returns an error if the tarball cannot be read, an entry cannot be
/// unpacked, or an entry attempts directory traversal.
pub fn extract_tarball(tarball: &Path, dest: &Path) -> Result<(), StoreError> {
    std::fs::create_dir_all(dest).map_err(|source| io_err(dest, source))?;
    let canonical_dest = std::fs::canonicalize(dest).map_err(|source| io_err(dest, source))?;

    let file = std::fs::File::open(tarball).map_err(|source| io_err(tarball, source))?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(decoder);

    let entries = archive.entries().map_err(|e| StoreError::Extract {
        message: e.to_string(),
    })?;

    for entry in entries {
        let mut entry = entry.map_err(|e| StoreError::Extract {
            message: e.to_string(),
        })?;
        let entry_path = entry.path().map_err(|e| StoreError::Extract {
            message: e.to_string(),
        })?;

        for component in entry_path.components() {
            if matches!(component, std::path::Component::ParentDir) {
                return Err(StoreError::PathTraversal {
                    entry_path: entry_path.display().to_string(),
                    dest: canonical_dest.display().to_string(),
                });
            }
        }

        let target = canonical_dest.join(&*entry_path);
        if !target.starts_with(&canonical_dest) {
            return Err(StoreError::PathTraversal {
                entry_path: entry_path.display().to_string(),
                dest: canonical_dest.display().to_string(),
            });
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|source| io_err(parent, source))?;
        }

        entry.unpack(&target).map_err(|e| StoreError::Extract {
            message: e.to_string(),
        })?;
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn make_tarball(entries: &[(&str, &[u8])]) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        let encoder = flate2::write::GzEncoder::new(file.reopen().unwrap(), flate2::Compression::fast());
        let mut builder = tar::Builder::new(encoder);
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_cksum();
            builder.append_data(&mut header, name, *content).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap().flush().unwrap();
        file
    }

    #[test]
    fn extracts_safe_entries() {
        let tarball = make_tarball(&[("subdir/hello.txt", b"hello")]);
        let dest = tempfile::tempdir().unwrap();
        extract_tarball(tarball.path(), dest.path()).unwrap();
        assert!(dest.path().join("subdir").join("hello.txt").exists());
    }

    #[test]
    fn rejects_parent_dir_traversal() {
        let tarball = make_tarball(&[("../../etc/evil.txt", b"pwned")]);
        let dest = tempfile::tempdir().unwrap();
        let result = extract_tarball(tarball.path(), dest.path());
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), StoreError::PathTraversal { .. }));
    }

    #[test]
    fn rejects_dotdot_in_middle() {
        let tarball = make_tarball(&[("foo/../../../escape.txt", b"pwned")]);
        let dest = tempfile::tempdir().unwrap();
        let result = extract_tarball(tarball.path(), dest.path());
        assert!(result.is_err());
    }
}
