//! Error types for depot-store.

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("i/o error at {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("path traversal in tarball entry \"{entry_path}\": would escape {dest}")]
    PathTraversal { entry_path: String, dest: String },

    #[error("failed to extract tarball: {message}")]
    Extract { message: String },

    #[error(
        "tree hash mismatch for {uuid}: expected {expected}, got {actual} (from {url})"
    )]
    HashMismatch {
        uuid: Uuid,
        expected: String,
        actual: String,
        url: String,
    },

    #[error("could not install {uuid}: every source failed ({})", tried.join("; "))]
    AllSourcesFailed { uuid: Uuid, tried: Vec<String> },

    #[error("git error: {message}")]
    Git { message: String },
}
