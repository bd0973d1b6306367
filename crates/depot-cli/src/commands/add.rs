//! `depot add Name[@version] ...` — spec.md §2 "Data flow for an `add`
//! operation".

use std::path::Path;

use depot_config::{CompatExpr, EnvCache};
use depot_resolver::PreserveLevel;

use crate::config::Config;
use crate::depots::{depot_search_path, load_registry};
use crate::env::{parse_spec, resolve_project_dir, ParsedSpec};
use crate::error::CliError;
use crate::usage;

fn resolve_uuid(registry: &depot_registry::Registry, spec: &ParsedSpec) -> Result<uuid::Uuid, CliError> {
    if let Some(uuid) = spec.uuid {
        return Ok(uuid);
    }
    let candidates = registry.uuids_for_name(&spec.name);
    match candidates.len() {
        0 => Err(CliError::UnknownPackage { name: spec.name.clone() }),
        1 => Ok(*candidates.iter().next().ok_or_else(|| CliError::UnknownPackage { name: spec.name.clone() })?),
        _ => Err(CliError::AmbiguousName {
            name: spec.name.clone(),
            candidates: candidates.into_iter().collect(),
        }),
    }
}

/// # Errors
/// Returns an error if the project cannot be located, a spec is malformed
/// or unresolvable, resolution fails at every preservation tier, or
/// installation fails.
pub fn run(project: Option<&Path>, raw_specs: &[String]) -> Result<(), CliError> {
    let project_dir = resolve_project_dir(project)?;
    let cfg = Config::from_env();
    let depots = depot_search_path()?;
    let registry = load_registry(&depots)?;

    let mut env = EnvCache::load(&project_dir)?;

    for raw in raw_specs {
        let spec = parse_spec(raw)?;
        let uuid = resolve_uuid(&registry, &spec)?;
        env.project.deps.insert(spec.name.clone(), uuid);
        if let Some(version) = &spec.version {
            let expr = CompatExpr::parse(&spec.name, &format!("={version}"))?;
            env.project.compat.insert(spec.name.clone(), expr);
        }
    }
    env.project.validate()?;

    let solution = crate::resolve::resolve(&env, &registry, &depots, &cfg, PreserveLevel::Tiered)?;
    let deps = crate::resolve::build_manifest_entries(&solution, &registry, &env.manifest.deps)?;

    let depot_root = depots.first().ok_or(CliError::NoDepotConfigured)?;
    crate::resolve::install_missing(depot_root, &deps, &registry, &depots, &cfg)?;

    env.manifest.deps = deps;
    env.manifest.project_hash = Some(env.project.project_hash());
    env.manifest.prune_unreachable(&env.project.deps);
    env.mark_mutated();
    env.write()?;

    usage::touch_manifest(depot_root, &env.manifest_path)?;

    for (name, uuid) in &env.project.deps {
        if let Some(version) = env.manifest.deps.get(uuid).and_then(|e| e.version.as_ref()) {
            eprintln!("   Resolved {name} v{version}");
        }
    }

    Ok(())
}
