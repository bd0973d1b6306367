//! `depot gc` — sweep every depot for package, clone, and artifact
//! directories no longer reachable from a known environment (spec.md
//! §4.F). Unlike every other subcommand, this one is depot-wide rather
//! than project-scoped: it walks `logs/manifest_usage.toml` for the set of
//! environments this depot has ever served, not just the current one.

use std::path::{Path, PathBuf};

use depot_artifact::{parse_artifacts_toml, ArtifactsFile};
use depot_config::{EnvCache, Manifest, SourceKind};
use depot_gc::{collect_garbage, GcInput, ScratchUsageLog, SweepConfig, UsageLog};
use depot_platform::Platform;
use uuid::Uuid;

use crate::config::Config;
use crate::depots::{depot_search_path, find_install_path};
use crate::error::CliError;
use crate::usage::load_toml_log;

fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn known_manifests(depot_root: &Path) -> Result<Vec<Manifest>, CliError> {
    let usage_path = depot_root.join("logs").join("manifest_usage.toml");
    let mut log: UsageLog<String> = load_toml_log(&usage_path, UsageLog::parse)?;
    log.condense(|path| Path::new(path).exists());

    let mut manifests = Vec::new();
    for manifest_path in log.keys() {
        let Some(env_dir) = Path::new(manifest_path).parent() else {
            continue;
        };
        if let Ok(env) = EnvCache::load(env_dir) {
            manifests.push(env.manifest);
        }
    }

    depot_util::fs::ensure_dir(&depot_root.join("logs"))?;
    depot_util::fs::write_atomic(&usage_path, log.to_toml_string().as_bytes())?;
    Ok(manifests)
}

fn artifact_files(depots: &[PathBuf], manifests: &[Manifest]) -> Vec<(Uuid, ArtifactsFile)> {
    let mut files = Vec::new();
    for manifest in manifests {
        for entry in manifest.deps.values() {
            let SourceKind::TreeHash(tree_hash) = entry.source else {
                continue;
            };
            let Some(dir) = find_install_path(depots, &entry.name, entry.uuid, &tree_hash) else {
                continue;
            };
            let Ok(content) = std::fs::read_to_string(dir.join("Artifacts.toml")) else {
                continue;
            };
            if let Ok(file) = parse_artifacts_toml(&content) {
                files.push((entry.uuid, file));
            }
        }
    }
    files
}

/// # Errors
/// Returns an error if a depot's usage or orphan logs cannot be read or
/// written.
pub fn run() -> Result<(), CliError> {
    let cfg = Config::from_env();
    let depots = depot_search_path()?;
    let host = Platform::host();

    for depot_root in &depots {
        let manifests = known_manifests(depot_root)?;
        let files = artifact_files(&depots, &manifests);

        let scratch_path = depot_root.join("logs").join("scratch_usage.toml");
        let scratch_usage = load_toml_log(&scratch_path, ScratchUsageLog::parse)?;

        let project_exists = |p: &str| Path::new(p).exists();

        let input = GcInput {
            depot_root: depot_root.as_path(),
            manifests: &manifests,
            artifact_files: &files,
            host: &host,
            overrides: None,
            scratch_usage: &scratch_usage,
            project_exists: &project_exists,
        };

        let config = SweepConfig {
            collect_delay: cfg.collect_delay,
            lock_staleness: depot_util::lock::DEFAULT_STALENESS,
            now: now_unix(),
        };

        let report = collect_garbage(&input, config)?;
        for path in report.deleted() {
            eprintln!("    Deleted {}", path.display());
        }
    }
    Ok(())
}
