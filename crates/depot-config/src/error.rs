//! Error types for depot-config.

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("cannot write {path}: {source}")]
    Write { path: String, source: std::io::Error },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("cannot serialize {path}: {source}")]
    Serialize {
        path: String,
        source: toml::ser::Error,
    },

    #[error("no project file (Project.toml or JuliaProject.toml) found at {path}")]
    ProjectNotFound { path: String },

    #[error("project name \"{name}\" is not a valid identifier")]
    InvalidName { name: String },

    #[error("project declares no name/uuid/version as a package, but {field} is set")]
    IncompletePackageIdentity { field: &'static str },

    #[error("duplicate dependency name \"{name}\" in project")]
    DuplicateDepName { name: String },

    #[error("duplicate dependency uuid \"{uuid}\" in project")]
    DuplicateDepUuid { uuid: uuid::Uuid },

    #[error("compat entry \"{name}\" does not refer to a declared dependency, extra, or \"julia\"")]
    UnknownCompatTarget { name: String },

    #[error("target \"{target}\" references undeclared dependency \"{name}\"")]
    UnknownTargetDep { target: String, name: String },

    #[error("unparseable compat expression \"{expr}\" for \"{name}\": {reason}")]
    InvalidCompat {
        name: String,
        expr: String,
        reason: String,
    },

    #[error("manifest entry \"{name}\" ({uuid}) must have exactly one of tree_hash, path, or be a version-less stdlib")]
    AmbiguousSourceKind { name: String, uuid: uuid::Uuid },

    #[error("manifest entry \"{name}\" ({uuid}) depends on unregistered uuid \"{dep_uuid}\"")]
    DanglingManifestDep {
        name: String,
        uuid: uuid::Uuid,
        dep_uuid: uuid::Uuid,
    },

    #[error("invalid tree hash \"{hash}\"")]
    InvalidTreeHash { hash: String },
}
