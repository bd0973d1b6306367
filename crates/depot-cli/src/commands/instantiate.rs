//! `depot instantiate` — download everything the manifest (or, failing
//! that, a fresh resolve of the project) names, without otherwise changing
//! version selections (spec.md §4.D).

use std::path::{Path, PathBuf};

use depot_artifact::{parse_artifacts_toml, Entry};
use depot_config::{EnvCache, SourceKind};
use depot_platform::Platform;
use depot_resolver::PreserveLevel;

use crate::config::Config;
use crate::depots::{depot_search_path, find_install_path, load_registry};
use crate::env::resolve_project_dir;
use crate::error::CliError;
use crate::usage;

fn install_artifacts_for_entry(depot_root: &Path, package_dir: &Path, cfg: &Config) -> Result<(), CliError> {
    let artifacts_toml = package_dir.join("Artifacts.toml");
    let Ok(content) = std::fs::read_to_string(&artifacts_toml) else {
        return Ok(());
    };
    let file = parse_artifacts_toml(&content)?;
    let host = Platform::host();

    for entry_value in file.values() {
        let chosen: Option<&Entry> = entry_value.entries().iter().find(|e| e.platform().is_none_or(|p| p.matches(&host)));
        let Some(entry) = chosen else { continue };
        if entry.lazy {
            continue;
        }
        depot_artifact::ensure_installed(depot_root, entry, &entry.git_tree_sha1, cfg.pkg_server.as_deref(), None)?;
    }

    usage::touch_artifacts(depot_root, &artifacts_toml)?;
    Ok(())
}

/// # Errors
/// Returns an error if the project cannot be located, a fresh resolve is
/// needed and fails, or any package or artifact fails to install.
pub fn run(project: Option<&Path>) -> Result<(), CliError> {
    let project_dir = resolve_project_dir(project)?;
    let cfg = Config::from_env();
    let depots = depot_search_path()?;
    let registry = load_registry(&depots)?;

    let mut env = EnvCache::load(&project_dir)?;

    if env.manifest.deps.is_empty() && !env.project.deps.is_empty() {
        let solution = crate::resolve::resolve(&env, &registry, &depots, &cfg, PreserveLevel::Tiered)?;
        let deps = crate::resolve::build_manifest_entries(&solution, &registry, &env.manifest.deps)?;
        env.manifest.deps = deps;
        env.manifest.project_hash = Some(env.project.project_hash());
        env.mark_mutated();
    }

    let depot_root = depots.first().ok_or(CliError::NoDepotConfigured)?;
    crate::resolve::install_missing(depot_root, &env.manifest.deps, &registry, &depots, &cfg)?;

    let mut package_dirs: Vec<PathBuf> = Vec::new();
    for entry in env.manifest.deps.values() {
        if let SourceKind::TreeHash(tree_hash) = entry.source {
            if let Some(dir) = find_install_path(&depots, &entry.name, entry.uuid, &tree_hash) {
                package_dirs.push(dir);
            }
        }
    }
    for dir in &package_dirs {
        install_artifacts_for_entry(depot_root, dir, &cfg)?;
    }

    env.write()?;
    usage::touch_manifest(depot_root, &env.manifest_path)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn instantiate_is_a_noop_on_a_dependency_free_project() {
        let _guard = ENV_LOCK.lock().unwrap();
        let depot_tmp = tempfile::tempdir().unwrap();
        std::env::set_var("DEPOT_PATH", depot_tmp.path());

        let project_tmp = tempfile::tempdir().unwrap();
        std::fs::write(project_tmp.path().join("Project.toml"), "").unwrap();

        assert!(run(Some(project_tmp.path())).is_ok());

        std::env::remove_var("DEPOT_PATH");
    }
}
