#![forbid(unsafe_code)]

pub mod error;
pub mod meta;
pub mod overrides;
pub mod select;
pub mod store;
pub mod toml_model;

pub use error::ArtifactError;
pub use meta::{artifact_meta, ResolvedEntry};
pub use overrides::{parse_overrides, resolve_hash_override, Overrides, ResolvedOverride};
pub use select::select_downloadable_artifacts;
pub use store::{artifact_path, create_artifact, ensure_installed, resolved_artifact_path};
pub use toml_model::{bind_entry, parse_artifacts_toml, to_toml_string, ArtifactsFile, DownloadSource, Entry, EntryValue};
