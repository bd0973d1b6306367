//! Project discovery and package-spec parsing shared by every subcommand.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::CliError;

/// Resolve the environment directory a command should operate on: the
/// explicit `--project` override if given, otherwise the current directory
/// (mirroring `cargo`'s `--manifest-path` convention, since a one-shot CLI
/// invocation has no long-running REPL session to hold a process-wide
/// "active project" pointer the way spec.md's `activate` describes).
pub fn resolve_project_dir(explicit: Option<&Path>) -> Result<PathBuf, CliError> {
    let dir = match explicit {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir().map_err(|source| CliError::Io {
            path: ".".to_owned(),
            source,
        })?,
    };

    if !dir.join("Project.toml").exists() && !dir.join("JuliaProject.toml").exists() {
        return Err(CliError::ProjectNotFound {
            path: dir.display().to_string(),
        });
    }
    Ok(dir)
}

/// One element of a user-supplied package spec list, e.g. `Example`,
/// `Example@1.2.3`, or `Example=7876af07-990d-54b4-ab0e-23690620f79a`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSpec {
    pub name: String,
    pub version: Option<semver::Version>,
    pub uuid: Option<Uuid>,
}

/// Parse one `name[@version]` or `name[=uuid]` token from the command line.
///
/// # Errors
/// Returns an error if the version or UUID half fails to parse.
pub fn parse_spec(raw: &str) -> Result<ParsedSpec, CliError> {
    if let Some((name, version_str)) = raw.split_once('@') {
        let version = semver::Version::parse(version_str).map_err(|e| CliError::InvalidSpec {
            spec: raw.to_owned(),
            reason: e.to_string(),
        })?;
        return Ok(ParsedSpec {
            name: name.to_owned(),
            version: Some(version),
            uuid: None,
        });
    }
    if let Some((name, uuid_str)) = raw.split_once('=') {
        let uuid = Uuid::parse_str(uuid_str).map_err(|e| CliError::InvalidSpec {
            spec: raw.to_owned(),
            reason: e.to_string(),
        })?;
        return Ok(ParsedSpec {
            name: name.to_owned(),
            version: None,
            uuid: Some(uuid),
        });
    }
    Ok(ParsedSpec {
        name: raw.to_owned(),
        version: None,
        uuid: None,
    })
}
