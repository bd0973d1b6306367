//! Error types for depot-cli.

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("no Project.toml or JuliaProject.toml found in {path} — run `depot activate` first")]
    ProjectNotFound { path: String },

    #[error("\"{name}\" is ambiguous across configured registries: {}", candidates.iter().map(Uuid::to_string).collect::<Vec<_>>().join(", "))]
    AmbiguousName { name: String, candidates: Vec<Uuid> },

    #[error("package \"{name}\" is not registered in any configured registry")]
    UnknownPackage { name: String },

    #[error("\"{name}\" is not a direct dependency of this project")]
    NotADirectDependency { name: String },

    #[error("invalid package spec \"{spec}\": {reason}")]
    InvalidSpec { spec: String, reason: String },

    #[error("no depot configured; set DEPOT_PATH or create $HOME/.depot")]
    NoDepotConfigured,

    #[error("could not install {name} ({uuid}): {source}")]
    Install {
        name: String,
        uuid: Uuid,
        #[source]
        source: depot_store::StoreError,
    },

    #[error(transparent)]
    Config(#[from] depot_config::ConfigError),

    #[error(transparent)]
    Registry(#[from] depot_registry::RegistryError),

    #[error(transparent)]
    Resolver(#[from] depot_resolver::ResolverError),

    #[error(transparent)]
    Artifact(#[from] depot_artifact::ArtifactError),

    #[error(transparent)]
    Gc(#[from] depot_gc::GcError),

    #[error(transparent)]
    Util(#[from] depot_util::UtilError),

    #[error("i/o error at {path}: {source}")]
    Io { path: String, source: std::io::Error },
}
