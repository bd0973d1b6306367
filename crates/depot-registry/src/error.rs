//! Error types for depot-registry.

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("cannot read registry descriptor {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("cannot parse registry descriptor {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("registries disagree on tree hash for {uuid} version {version}: {first_source} says {first_hash}, {second_source} says {second_hash}")]
    HashDisagreement {
        uuid: Uuid,
        version: String,
        first_source: String,
        first_hash: String,
        second_source: String,
        second_hash: String,
    },

    #[error("package {uuid} is not registered in any configured registry")]
    NotRegistered { uuid: Uuid },

    #[error("invalid compat range \"{range}\" in registry descriptor for {uuid} version {version}: {reason}")]
    InvalidCompatRange {
        uuid: Uuid,
        version: String,
        range: String,
        reason: String,
    },
}
