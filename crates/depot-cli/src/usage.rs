//! Touching `logs/manifest_usage.toml` / `logs/artifact_usage.toml` so
//! `depot gc` knows an environment is still alive (spec.md §3 "Usage log").

use std::path::Path;

use depot_gc::UsageLog;

use crate::error::CliError;

fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Read and parse a TOML-backed log, treating a missing file as an empty
/// `T::default()` rather than an error.
pub fn load_toml_log<T, F>(path: &Path, parse: F) -> Result<T, CliError>
where
    F: FnOnce(&str, &str) -> Result<T, depot_gc::GcError>,
    T: Default,
{
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(parse(&path.display().to_string(), &content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(source) => Err(CliError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

fn record_and_write(log_path: &Path, key: &str) -> Result<(), CliError> {
    let mut log: UsageLog<String> = load_toml_log(log_path, UsageLog::parse)?;
    log.record(key.to_owned(), now_unix());
    if let Some(parent) = log_path.parent() {
        depot_util::fs::ensure_dir(parent)?;
    }
    depot_util::fs::write_atomic(log_path, log.to_toml_string().as_bytes())?;
    Ok(())
}

/// Record that `manifest_path` was touched by this invocation.
///
/// # Errors
/// Returns an error if the log cannot be read or written.
pub fn touch_manifest(depot_root: &Path, manifest_path: &Path) -> Result<(), CliError> {
    record_and_write(&depot_root.join("logs").join("manifest_usage.toml"), &manifest_path.display().to_string())
}

/// Record that `artifacts_toml_path` was touched by this invocation.
///
/// # Errors
/// Returns an error if the log cannot be read or written.
pub fn touch_artifacts(depot_root: &Path, artifacts_toml_path: &Path) -> Result<(), CliError> {
    record_and_write(
        &depot_root.join("logs").join("artifact_usage.toml"),
        &artifacts_toml_path.display().to_string(),
    )
}
