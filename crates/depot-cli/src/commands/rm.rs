//! `depot rm Name ...` — remove direct dependencies and re-resolve.

use std::path::Path;

use depot_config::EnvCache;
use depot_resolver::PreserveLevel;

use crate::config::Config;
use crate::depots::{depot_search_path, load_registry};
use crate::env::resolve_project_dir;
use crate::error::CliError;
use crate::usage;

/// # Errors
/// Returns an error if the project cannot be located, any name is not a
/// direct dependency, or re-resolution fails.
pub fn run(project: Option<&Path>, names: &[String]) -> Result<(), CliError> {
    let project_dir = resolve_project_dir(project)?;
    let cfg = Config::from_env();
    let depots = depot_search_path()?;
    let registry = load_registry(&depots)?;

    let mut env = EnvCache::load(&project_dir)?;

    for name in names {
        if env.project.deps.remove(name).is_none() {
            return Err(CliError::NotADirectDependency { name: name.clone() });
        }
        env.project.compat.remove(name);
        env.project.extras.remove(name);
    }
    env.project.validate()?;

    let solution = crate::resolve::resolve(&env, &registry, &depots, &cfg, PreserveLevel::Tiered)?;
    let deps = crate::resolve::build_manifest_entries(&solution, &registry, &env.manifest.deps)?;

    env.manifest.deps = deps;
    env.manifest.project_hash = Some(env.project.project_hash());
    env.manifest.prune_unreachable(&env.project.deps);
    env.mark_mutated();
    env.write()?;

    if let Some(depot_root) = depots.first() {
        usage::touch_manifest(depot_root, &env.manifest_path)?;
    }

    for name in names {
        eprintln!("    Removed {name}");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn rm_rejects_name_not_a_direct_dependency() {
        let _guard = ENV_LOCK.lock().unwrap();
        let depot_tmp = tempfile::tempdir().unwrap();
        std::env::set_var("DEPOT_PATH", depot_tmp.path());

        let project_tmp = tempfile::tempdir().unwrap();
        std::fs::write(project_tmp.path().join("Project.toml"), "").unwrap();

        let result = run(Some(project_tmp.path()), &["Ghost".to_owned()]);
        assert!(matches!(result, Err(CliError::NotADirectDependency { name }) if name == "Ghost"));

        std::env::remove_var("DEPOT_PATH");
    }
}
