//! Error types for depot-artifact.

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("cannot access {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("invalid Artifacts.toml: {0}")]
    InvalidToml(#[from] toml::de::Error),

    #[error("invalid Overrides.toml key \"{key}\": not a 40-hex-char tree hash or a UUID")]
    InvalidOverrideKey { key: String },

    #[error("invalid Overrides.toml value for \"{key}\": expected a string")]
    InvalidOverrideValue { key: String },

    #[error("artifact \"{name}\" already bound for this platform; pass force to replace it")]
    NameCollision { name: String },

    #[error("could not install artifact {hash}: every source failed ({})", tried.join("; "))]
    AllSourcesFailed { hash: String, tried: Vec<String> },

    #[error("tree hash mismatch for artifact: expected {expected}, got {actual} (from {url})")]
    HashMismatch {
        expected: String,
        actual: String,
        url: String,
    },

    #[error("{0}")]
    Store(#[from] depot_store::StoreError),

    #[error("{0}")]
    Util(#[from] depot_util::UtilError),
}
