//! Sweep, delayed deletion, and empty-shell pruning (spec.md §4.F steps
//! 5–7).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::orphan::OrphanLog;

/// Knobs for one sweep run.
#[derive(Debug, Clone, Copy)]
pub struct SweepConfig {
    pub collect_delay: Duration,
    pub lock_staleness: Duration,
    /// Current time (unix seconds), threaded in rather than read from the
    /// clock so sweeps are deterministic in tests.
    pub now: u64,
}

/// What happened to a candidate path during one sweep.
#[derive(Debug, Clone)]
pub enum SweepOutcome {
    Deleted(PathBuf),
    RetainedAsOrphan(PathBuf),
    DeletionFailed { path: PathBuf, message: String },
    Live(PathBuf),
    SkippedLocked(PathBuf),
}

/// Result of one full sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub outcomes: Vec<SweepOutcome>,
}

impl SweepReport {
    #[must_use]
    pub fn deleted(&self) -> Vec<&Path> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                SweepOutcome::Deleted(path) => Some(path.as_path()),
                _ => None,
            })
            .collect()
    }
}

fn list_entries(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default()
}

/// Enumerate orphan-candidate paths under `<depot>/packages/*/*`,
/// `<depot>/artifacts/*`, `<depot>/clones/*`, `<depot>/scratchspaces/*/*`.
#[must_use]
pub fn candidate_paths(depot_root: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    for name_dir in list_entries(&depot_root.join("packages")) {
        candidates.extend(list_entries(&name_dir));
    }
    candidates.extend(list_entries(&depot_root.join("artifacts")));
    candidates.extend(list_entries(&depot_root.join("clones")));
    for uuid_dir in list_entries(&depot_root.join("scratchspaces")) {
        candidates.extend(list_entries(&uuid_dir));
    }

    candidates.sort();
    candidates
}

/// Run one sweep: classify every candidate path as live, locked,
/// deleted, or retained as an orphan, and mutate `orphan_log` to reflect
/// the run.
pub fn sweep(depot_root: &Path, live: &BTreeSet<PathBuf>, orphan_log: &mut OrphanLog, config: SweepConfig) -> SweepReport {
    let candidates = candidate_paths(depot_root);
    let mut still_present = BTreeSet::new();
    let mut report = SweepReport::default();

    for path in candidates {
        let key = path.display().to_string();

        if live.contains(&path) {
            orphan_log.remove(&key);
            report.outcomes.push(SweepOutcome::Live(path));
            continue;
        }

        if depot_util::lock::is_locked(&path, config.lock_staleness) {
            report.outcomes.push(SweepOutcome::SkippedLocked(path));
            continue;
        }

        still_present.insert(key.clone());
        let first_seen = orphan_log.first_seen_or_record(&key, config.now);

        if config.now.saturating_sub(first_seen) >= config.collect_delay.as_secs() {
            match depot_util::fs::remove_dir_all_if_exists(&path) {
                Ok(()) => {
                    orphan_log.remove(&key);
                    report.outcomes.push(SweepOutcome::Deleted(path));
                }
                Err(e) => {
                    log::warn!("failed to delete orphan {}: {e}", path.display());
                    report.outcomes.push(SweepOutcome::DeletionFailed {
                        path,
                        message: e.to_string(),
                    });
                }
            }
        } else {
            report.outcomes.push(SweepOutcome::RetainedAsOrphan(path));
        }
    }

    orphan_log.retain(|key| still_present.contains(key));
    prune_empty_shells(depot_root);

    report
}

/// Remove now-empty `packages/<Name>/` and `scratchspaces/<uuid>/`
/// directories (spec.md §4.F step 7).
fn prune_empty_shells(depot_root: &Path) {
    for dir in [depot_root.join("packages"), depot_root.join("scratchspaces")] {
        for shell in list_entries(&dir) {
            if shell.is_dir() && list_entries(&shell).is_empty() {
                let _ = std::fs::remove_dir(&shell);
            }
        }
    }
}
