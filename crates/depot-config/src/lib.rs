#![forbid(unsafe_code)]

pub mod compat;
pub mod error;
pub mod io;
pub mod manifest;
pub mod ordering;
pub mod packagespec;
pub mod project;

pub use compat::CompatExpr;
pub use error::ConfigError;
pub use io::{activate, ActivateContext, ActivateTarget, EnvCache};
pub use manifest::{Manifest, ManifestEntry, RepoInfo, SourceKind};
pub use packagespec::PackageSpec;
pub use project::{Project, SourcePin};
