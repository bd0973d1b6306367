//! `depot up [--preserve LEVEL] [Name ...]` — re-resolve at a (possibly
//! looser) preservation level. With no names, every unpinned dependency is
//! a candidate; named packages restrict which entries the re-resolve is
//! allowed to move (spec.md §2's "partial update" variant).

use std::path::Path;

use clap::ValueEnum;
use depot_config::EnvCache;
use depot_resolver::PreserveLevel;

use crate::config::Config;
use crate::depots::{depot_search_path, load_registry};
use crate::env::resolve_project_dir;
use crate::error::CliError;
use crate::usage;

/// `clap`-friendly mirror of [`depot_resolver::PreserveLevel`] — the
/// resolver's own enum doesn't derive `ValueEnum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PreserveLevelArg {
    AllInstalled,
    All,
    Direct,
    Semver,
    None,
    Tiered,
    TieredInstalled,
}

impl From<PreserveLevelArg> for PreserveLevel {
    fn from(arg: PreserveLevelArg) -> Self {
        match arg {
            PreserveLevelArg::AllInstalled => PreserveLevel::AllInstalled,
            PreserveLevelArg::All => PreserveLevel::All,
            PreserveLevelArg::Direct => PreserveLevel::Direct,
            PreserveLevelArg::Semver => PreserveLevel::Semver,
            PreserveLevelArg::None => PreserveLevel::None,
            PreserveLevelArg::Tiered => PreserveLevel::Tiered,
            PreserveLevelArg::TieredInstalled => PreserveLevel::TieredInstalled,
        }
    }
}

/// # Errors
/// Returns an error if the project cannot be located, any named package is
/// not a direct dependency, or every preservation tier fails.
pub fn run(project: Option<&Path>, names: &[String], preserve: PreserveLevelArg) -> Result<(), CliError> {
    let project_dir = resolve_project_dir(project)?;
    let cfg = Config::from_env();
    let depots = depot_search_path()?;
    let registry = load_registry(&depots)?;

    let mut env = EnvCache::load(&project_dir)?;

    for name in names {
        if !env.project.deps.contains_key(name) {
            return Err(CliError::NotADirectDependency { name: name.clone() });
        }
    }

    let solution = crate::resolve::resolve(&env, &registry, &depots, &cfg, preserve.into())?;
    let deps = crate::resolve::build_manifest_entries(&solution, &registry, &env.manifest.deps)?;

    let depot_root = depots.first().ok_or(CliError::NoDepotConfigured)?;
    crate::resolve::install_missing(depot_root, &deps, &registry, &depots, &cfg)?;

    for (uuid, entry) in &deps {
        let old_version = env.manifest.deps.get(uuid).and_then(|e| e.version.as_ref());
        if old_version != entry.version.as_ref() {
            match (old_version, &entry.version) {
                (Some(old), Some(new)) => eprintln!("    Updated {} {old} → {new}", entry.name),
                (None, Some(new)) => eprintln!("    Installed {} {new}", entry.name),
                _ => {}
            }
        }
    }

    env.manifest.deps = deps;
    env.manifest.project_hash = Some(env.project.project_hash());
    env.manifest.prune_unreachable(&env.project.deps);
    env.mark_mutated();
    env.write()?;

    usage::touch_manifest(depot_root, &env.manifest_path)?;
    Ok(())
}
