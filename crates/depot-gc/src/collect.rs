//! End-to-end garbage collection entry point, wiring usage logs, live-set
//! marking, and the sweep together (spec.md §4.F).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use depot_artifact::{ArtifactsFile, Overrides};
use depot_config::Manifest;
use depot_platform::Platform;
use uuid::Uuid;

use crate::error::GcError;
use crate::orphan::OrphanLog;
use crate::scratch::ScratchUsageLog;
use crate::sweep::{self, SweepConfig, SweepReport};
use crate::{live_artifact_paths, live_clone_paths, live_package_paths};

/// Everything needed to run one GC pass over a single depot.
pub struct GcInput<'a> {
    pub depot_root: &'a Path,
    /// Every `Manifest.toml`/`JuliaManifest.toml` known to reference this depot.
    pub manifests: &'a [Manifest],
    /// Parsed `Artifacts.toml` files, each tagged with the owning package's UUID.
    pub artifact_files: &'a [(Uuid, ArtifactsFile)],
    pub host: &'a Platform,
    pub overrides: Option<&'a Overrides>,
    pub scratch_usage: &'a ScratchUsageLog,
    pub project_exists: &'a dyn Fn(&str) -> bool,
}

fn load_orphan_log(path: &Path) -> Result<OrphanLog, GcError> {
    match std::fs::read_to_string(path) {
        Ok(content) => OrphanLog::parse(&path.display().to_string(), &content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(OrphanLog::new()),
        Err(source) => Err(GcError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Run one full GC pass: mark live paths, sweep the depot, and persist
/// `orphaned.toml`.
///
/// # Errors
/// Returns an error if `orphaned.toml` cannot be read or written.
pub fn collect_garbage(input: &GcInput, config: SweepConfig) -> Result<SweepReport, GcError> {
    let mut live: BTreeSet<PathBuf> = BTreeSet::new();

    for manifest in input.manifests {
        live.extend(live_package_paths(input.depot_root, manifest));
        live.extend(live_clone_paths(input.depot_root, manifest));
    }

    for (uuid, file) in input.artifact_files {
        live.extend(live_artifact_paths(input.depot_root, *uuid, file, input.host, input.overrides));
    }

    for path in input.scratch_usage.paths() {
        if input.scratch_usage.is_live(path, input.project_exists) {
            live.insert(PathBuf::from(path));
        }
    }

    let logs_dir = input.depot_root.join("logs");
    let orphan_path = logs_dir.join("orphaned.toml");
    let mut orphan_log = load_orphan_log(&orphan_path)?;

    let report = sweep::sweep(input.depot_root, &live, &mut orphan_log, config);

    depot_util::fs::ensure_dir(&logs_dir)?;
    depot_util::fs::write_atomic(&orphan_path, orphan_log.to_toml_string().as_bytes())?;

    Ok(report)
}
