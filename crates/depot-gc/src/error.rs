//! Error types for depot-gc.

#[derive(Debug, thiserror::Error)]
pub enum GcError {
    #[error("cannot access {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("invalid usage log at {path}: {message}")]
    InvalidLog { path: String, message: String },

    #[error("{0}")]
    Config(#[from] depot_config::ConfigError),

    #[error("{0}")]
    Util(#[from] depot_util::UtilError),
}
