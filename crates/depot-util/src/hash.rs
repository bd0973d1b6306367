//! Hashing utilities: tarball digests (SHA-256) and tree digests (git-tree SHA-1).

use std::path::Path;

use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::UtilError;

/// Compute the SHA-256 hex digest of a byte slice.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Compute the SHA-256 hex digest of a file using streaming reads.
///
/// Uses a 64 KiB buffer to avoid loading the entire file into memory, which
/// matters for large tarballs.
///
/// # Errors
/// Returns an error if the file cannot be opened or read.
pub fn sha256_file(path: &Path) -> Result<String, UtilError> {
    let file = std::fs::File::open(path).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = std::io::BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = std::io::Read::read(&mut reader, &mut buf).map_err(|source| UtilError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if n == 0 {
            break;
        }
        let Some(chunk) = buf.get(..n) else {
            break;
        };
        hasher.update(chunk);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Combine multiple string parts into a single composite SHA-256 hash.
///
/// Each part is hashed in order with a length prefix to prevent ambiguity
/// between e.g. `["ab", "c"]` and `["a", "bc"]`.
pub fn sha256_multi(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        let len_bytes = part.len().to_le_bytes();
        hasher.update(len_bytes);
        hasher.update(part.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Format a 20-byte tree hash as lower-case hex.
pub fn tree_hash_hex(hash: &[u8; 20]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Parse a lower-case hex tree hash back into 20 bytes.
pub fn parse_tree_hash(hex: &str) -> Option<[u8; 20]> {
    if hex.len() != 40 {
        return None;
    }
    let mut out = [0u8; 20];
    for (i, chunk) in out.iter_mut().enumerate() {
        let byte_str = hex.get(i * 2..i * 2 + 2)?;
        *chunk = u8::from_str_radix(byte_str, 16).ok()?;
    }
    Some(out)
}

fn sha1_20(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(unix)]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &std::fs::Metadata) -> bool {
    false
}

enum Entry {
    Blob { name: String, executable: bool, hash: [u8; 20] },
    Tree { name: String, hash: [u8; 20] },
}

impl Entry {
    fn sort_key(&self) -> String {
        // Git sorts tree entries as if directory names carried a trailing
        // slash, so a file `foo` sorts before a directory `foo.d` but after
        // a directory `foo` would if both existed (they can't).
        match self {
            Entry::Blob { name, .. } => name.clone(),
            Entry::Tree { name, .. } => format!("{name}/"),
        }
    }

    fn mode(&self) -> &'static str {
        match self {
            Entry::Blob { executable: true, .. } => "100755",
            Entry::Blob { executable: false, .. } => "100644",
            Entry::Tree { .. } => "40000",
        }
    }

    fn name(&self) -> &str {
        match self {
            Entry::Blob { name, .. } | Entry::Tree { name, .. } => name,
        }
    }

    fn hash(&self) -> &[u8; 20] {
        match self {
            Entry::Blob { hash, .. } | Entry::Tree { hash, .. } => hash,
        }
    }
}

/// Compute the git-tree SHA-1 hash of a directory's contents.
///
/// Invariant to file timestamps and to permission bits other than the
/// executable bit, matching git's own `git hash-object -t tree`. Hidden
/// files (dotfiles) are included; nothing in this layer treats any name as
/// special.
///
/// # Errors
/// Returns an error if the directory (or any entry within it) cannot be read.
pub fn git_tree_hash(dir: &Path) -> Result<[u8; 20], UtilError> {
    let mut dir_entries: Vec<std::fs::DirEntry> = std::fs::read_dir(dir)
        .map_err(|source| UtilError::Io {
            path: dir.display().to_string(),
            source,
        })?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| UtilError::Io {
            path: dir.display().to_string(),
            source,
        })?;
    dir_entries.sort_by_key(std::fs::DirEntry::file_name);

    let mut entries = Vec::with_capacity(dir_entries.len());
    for dir_entry in dir_entries {
        let path = dir_entry.path();
        let name = dir_entry.file_name().to_string_lossy().into_owned();
        let meta = std::fs::symlink_metadata(&path).map_err(|source| UtilError::Io {
            path: path.display().to_string(),
            source,
        })?;

        if meta.is_dir() {
            let hash = git_tree_hash(&path)?;
            entries.push(Entry::Tree { name, hash });
        } else {
            let content = std::fs::read(&path).map_err(|source| UtilError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let header = format!("blob {}\0", content.len());
            let mut blob = Vec::with_capacity(header.len() + content.len());
            blob.extend_from_slice(header.as_bytes());
            blob.extend_from_slice(&content);
            let hash = sha1_20(&blob);
            entries.push(Entry::Blob {
                name,
                executable: is_executable(&meta),
                hash,
            });
        }
    }

    entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    let mut body = Vec::new();
    for entry in &entries {
        body.extend_from_slice(entry.mode().as_bytes());
        body.push(b' ');
        body.extend_from_slice(entry.name().as_bytes());
        body.push(0);
        body.extend_from_slice(entry.hash());
    }

    let header = format!("tree {}\0", body.len());
    let mut tree = Vec::with_capacity(header.len() + body.len());
    tree.extend_from_slice(header.as_bytes());
    tree.extend_from_slice(&body);

    Ok(sha1_20(&tree))
}
