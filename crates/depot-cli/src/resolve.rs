//! Shared resolve → install → write pipeline driving `add`, `rm`, `up`, and
//! `instantiate` (spec.md §2 "Data flow for an `add` operation").

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use depot_config::{EnvCache, ManifestEntry, SourceKind};
use depot_registry::Registry;
use depot_resolver::{build_graph, resolve_with_preservation, FixedKind, FixedNode, GraphInput, PreserveLevel, RootRequirement, Solution, TierContext};
use depot_store::InstallRequest;
use uuid::Uuid;

use crate::config::Config;
use crate::depots::is_installed_anywhere;
use crate::error::CliError;

/// Build one root requirement per declared project dependency not already
/// fixed (dev-tracked or pinned — see `build_fixed`), pulling its compat
/// range from `project.compat` when present.
///
/// `CompatExpr` models a disjunction of semver intervals but
/// `RootRequirement::range` takes a single `VersionReq` — a comma-joined
/// compat expression therefore degrades to `VersionReq::STAR` with a
/// warning rather than being rejected outright. `solve` intersects every
/// root's `range` against the UUID's candidate domain (`Graph::root_ranges`),
/// so an exact-version range from a `depot add Name@version` pin is actually
/// enforced, not just recorded.
fn build_roots(env: &EnvCache, fixed_uuids: &BTreeSet<Uuid>) -> Vec<RootRequirement> {
    env.project
        .deps
        .iter()
        .filter(|(_, uuid)| !fixed_uuids.contains(uuid))
        .map(|(name, uuid)| {
            let range = env
                .project
                .compat
                .get(name)
                .map(|expr| {
                    semver::VersionReq::parse(expr.as_str().trim()).unwrap_or_else(|_| {
                        log::warn!("compat expression \"{}\" for {name} has multiple clauses; root requirement relaxed to \"*\"", expr.as_str());
                        semver::VersionReq::STAR
                    })
                })
                .unwrap_or(semver::VersionReq::STAR);
            RootRequirement {
                uuid: *uuid,
                name: name.clone(),
                range,
            }
        })
        .collect()
}

/// Build one [`FixedNode`] per dev-tracked (`path`-pinned) or `pinned`
/// manifest entry, exempting each from the solver entirely — a fixed UUID
/// gets a single-version node straight from `build_graph`, so no tier's
/// preservation logic can move it.
///
/// A dev dependency's own `Project.toml` is not read here — its transitive
/// deps are treated as empty and its version defaults to `0.0.0` when
/// unset — so a dev-tracked package can be depended on by name but its own
/// requirements don't yet propagate into the graph. Full support would mean
/// parsing the dev project's manifest at its path, which needs wiring this
/// module doesn't have yet.
///
/// A `pinned` entry's own dependency ranges *are* looked up from `registry`
/// at its recorded version, so its transitive requirements still constrain
/// the rest of the graph normally; only the pinned UUID's own version is
/// exempt from re-resolution.
fn build_fixed(env: &EnvCache, registry: &Registry) -> Vec<FixedNode> {
    env.manifest
        .deps
        .values()
        .filter_map(|entry| {
            if matches!(entry.source, SourceKind::Path(_)) {
                return Some(FixedNode {
                    uuid: entry.uuid,
                    name: entry.name.clone(),
                    version: entry.version.clone().unwrap_or(semver::Version::new(0, 0, 0)),
                    tree_hash: None,
                    deps: BTreeMap::new(),
                    kind: FixedKind::Dev,
                });
            }
            if !entry.pinned {
                return None;
            }
            let version = entry.version.clone().unwrap_or(semver::Version::new(0, 0, 0));
            let tree_hash = match entry.source {
                SourceKind::TreeHash(hash) => Some(hash),
                SourceKind::Path(_) | SourceKind::Stdlib => None,
            };
            let deps = registry
                .lookup(entry.uuid)
                .ok()
                .flatten()
                .and_then(|info| info.versions.get(&version).cloned())
                .map(|version_info| version_info.compat)
                .unwrap_or_default();
            Some(FixedNode {
                uuid: entry.uuid,
                name: entry.name.clone(),
                version,
                tree_hash,
                deps,
                kind: FixedKind::Pinned,
            })
        })
        .collect()
}

fn is_downloaded_closure<'a>(
    registry: &'a Registry,
    depots: &'a [PathBuf],
) -> impl Fn(Uuid, &semver::Version) -> bool + 'a {
    move |uuid, version| {
        let Ok(Some(info)) = registry.lookup(uuid) else {
            return false;
        };
        let Some(version_info) = info.versions.get(version) else {
            return false;
        };
        is_installed_anywhere(depots, &info.name, uuid, &version_info.tree_hash)
    }
}

/// Run one resolve at `preserve` and return the chosen versions.
///
/// # Errors
/// Returns an error if the graph cannot be built or every preservation
/// tier fails.
pub fn resolve(env: &EnvCache, registry: &Registry, depots: &[PathBuf], cfg: &Config, preserve: PreserveLevel) -> Result<Solution, CliError> {
    let fixed = build_fixed(env, registry);
    let fixed_uuids: BTreeSet<Uuid> = fixed.iter().map(|f| f.uuid).collect();
    let roots = build_roots(env, &fixed_uuids);
    let stdlibs = BTreeMap::new();
    let is_downloaded = is_downloaded_closure(registry, depots);

    let graph = build_graph(&GraphInput {
        registry,
        roots: &roots,
        fixed: &fixed,
        stdlibs: &stdlibs,
        offline: cfg.offline,
        is_downloaded: &is_downloaded,
    })?;

    let current_manifest: BTreeMap<Uuid, semver::Version> = env
        .manifest
        .deps
        .values()
        .filter_map(|e| e.version.clone().map(|v| (e.uuid, v)))
        .collect();
    let direct_uuids: BTreeSet<Uuid> = env.project.deps.values().copied().collect();

    let ctx = TierContext {
        current_manifest: &current_manifest,
        direct_uuids: &direct_uuids,
        is_installed: &is_downloaded,
    };

    Ok(resolve_with_preservation(&graph, preserve, &ctx)?)
}

/// Materialize `solution` into a fresh manifest, carrying over existing
/// `path`/pinned entries untouched where the solver didn't revisit them.
///
/// # Errors
/// Returns an error if two registries disagree on a package's tree hash
/// (surfaced by `Registry::lookup`).
pub fn build_manifest_entries(
    solution: &Solution,
    registry: &Registry,
    existing: &BTreeMap<Uuid, ManifestEntry>,
) -> Result<BTreeMap<Uuid, ManifestEntry>, CliError> {
    let mut deps = BTreeMap::new();

    for (uuid, version) in &solution.versions {
        if let Some(prior) = existing.get(uuid) {
            if matches!(prior.source, SourceKind::Path(_)) {
                deps.insert(*uuid, prior.clone());
                continue;
            }
        }

        let Some(info) = registry.lookup(*uuid)? else {
            continue;
        };
        let Some(version_info) = info.versions.get(version) else {
            continue;
        };

        let mut entry = ManifestEntry::registry(info.name.clone(), *uuid, version.clone(), version_info.tree_hash);
        entry.pinned = existing.get(uuid).is_some_and(|e| e.pinned);

        for dep_uuid in version_info.compat.keys() {
            if !solution.versions.contains_key(dep_uuid) {
                continue;
            }
            if let Some(dep_info) = registry.lookup(*dep_uuid)? {
                entry.deps.insert(dep_info.name, *dep_uuid);
            }
        }

        deps.insert(*uuid, entry);
    }

    Ok(deps)
}

/// Install every `TreeHash`-sourced manifest entry not yet present in any
/// configured depot, with fan-out bounded by `cfg.concurrent_downloads`
/// (spec.md §4.D "Concurrency").
///
/// # Errors
/// Returns the first installation failure encountered; spec.md §4.D's
/// "a single failing package aborts the whole `add`".
pub fn install_missing(
    depot_root: &Path,
    deps: &BTreeMap<Uuid, ManifestEntry>,
    registry: &Registry,
    depots: &[PathBuf],
    cfg: &Config,
) -> Result<(), CliError> {
    let mut requests = Vec::new();
    for entry in deps.values() {
        let SourceKind::TreeHash(tree_hash) = entry.source else {
            continue;
        };
        if is_installed_anywhere(depots, &entry.name, entry.uuid, &tree_hash) {
            continue;
        }
        let repo_urls = registry
            .lookup(entry.uuid)
            .ok()
            .flatten()
            .and_then(|info| info.repo_url)
            .into_iter()
            .collect();
        requests.push(InstallRequest {
            uuid: entry.uuid,
            name: entry.name.clone(),
            tree_hash,
            package_server: cfg.pkg_server.clone(),
            repo_urls,
        });
    }

    if requests.is_empty() {
        return Ok(());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cfg.concurrent_downloads)
        .build()
        .map_err(|e| CliError::Io {
            path: "installer thread pool".to_owned(),
            source: std::io::Error::other(e.to_string()),
        })?;

    let results = pool.install(|| depot_store::install_all(depot_root, &requests));

    for (req, result) in requests.iter().zip(results) {
        if let Err(source) = result {
            return Err(CliError::Install {
                name: req.name.clone(),
                uuid: req.uuid,
                source,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use depot_registry::{PackageInfo, PackageVersionInfo};

    fn uuid_n(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn build_manifest_entries_picks_tree_hash_from_registry() {
        let a = uuid_n(1);
        let mut versions = BTreeMap::new();
        versions.insert(
            semver::Version::new(1, 0, 0),
            PackageVersionInfo {
                tree_hash: [9u8; 20],
                compat: BTreeMap::new(),
                yanked: false,
            },
        );
        let registry = Registry::from_packages(
            "r",
            vec![PackageInfo {
                uuid: a,
                name: "A".to_owned(),
                repo_url: None,
                versions,
            }],
        );

        let mut solution_versions = BTreeMap::new();
        solution_versions.insert(a, semver::Version::new(1, 0, 0));
        let solution = Solution { versions: solution_versions };

        let deps = build_manifest_entries(&solution, &registry, &BTreeMap::new()).unwrap();
        assert_eq!(deps[&a].name, "A");
        assert!(matches!(deps[&a].source, SourceKind::TreeHash(h) if h == [9u8; 20]));
    }

    #[test]
    fn build_fixed_and_roots_split_dev_tracked_from_registry_deps() {
        let a = uuid_n(1);
        let b = uuid_n(2);
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Project.toml"),
            format!("[deps]\nA = \"{a}\"\nB = \"{b}\"\n"),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("Manifest.toml"),
            format!(
                "[[deps.A]]\nname = \"A\"\nuuid = \"{a}\"\nversion = \"1.2.3\"\npath = \"../dev/A\"\n\n\
                 [[deps.B]]\nname = \"B\"\nuuid = \"{b}\"\nversion = \"2.0.0\"\ngit-tree-sha1 = \"{}\"\n",
                "01".repeat(20)
            ),
        )
        .unwrap();
        let env = EnvCache::load(dir.path()).unwrap();
        let registry = Registry::from_packages("r", vec![]);

        let fixed = build_fixed(&env, &registry);
        assert_eq!(fixed.len(), 1);
        assert_eq!(fixed[0].uuid, a);
        assert_eq!(fixed[0].version, semver::Version::new(1, 2, 3));
        assert!(matches!(fixed[0].kind, FixedKind::Dev));

        let fixed_uuids: BTreeSet<Uuid> = fixed.iter().map(|f| f.uuid).collect();
        let roots = build_roots(&env, &fixed_uuids);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].uuid, b);
    }

    #[test]
    fn build_fixed_promotes_a_pinned_registry_entry_and_keeps_its_own_deps() {
        let a = uuid_n(1);
        let c = uuid_n(3);
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Project.toml"), format!("[deps]\nA = \"{a}\"\n")).unwrap();
        std::fs::write(
            dir.path().join("Manifest.toml"),
            format!(
                "[[deps.A]]\nname = \"A\"\nuuid = \"{a}\"\nversion = \"1.0.0\"\ngit-tree-sha1 = \"{}\"\npinned = true\n",
                "02".repeat(20)
            ),
        )
        .unwrap();
        let env = EnvCache::load(dir.path()).unwrap();

        let mut compat = BTreeMap::new();
        compat.insert(c, semver::VersionReq::parse("^1").unwrap());
        let mut versions = BTreeMap::new();
        versions.insert(
            semver::Version::new(1, 0, 0),
            PackageVersionInfo {
                tree_hash: [2u8; 20],
                compat,
                yanked: false,
            },
        );
        let registry = Registry::from_packages(
            "r",
            vec![PackageInfo {
                uuid: a,
                name: "A".to_owned(),
                repo_url: None,
                versions,
            }],
        );

        let fixed = build_fixed(&env, &registry);
        assert_eq!(fixed.len(), 1);
        assert_eq!(fixed[0].uuid, a);
        assert_eq!(fixed[0].version, semver::Version::new(1, 0, 0));
        assert!(matches!(fixed[0].kind, FixedKind::Pinned));
        assert_eq!(fixed[0].deps.get(&c), Some(&semver::VersionReq::parse("^1").unwrap()));

        let fixed_uuids: BTreeSet<Uuid> = fixed.iter().map(|f| f.uuid).collect();
        assert!(build_roots(&env, &fixed_uuids).is_empty());
    }

    #[test]
    fn build_manifest_entries_preserves_dev_path_entries() {
        let a = uuid_n(1);
        let mut existing = BTreeMap::new();
        existing.insert(a, ManifestEntry::dev("A", a, Some(semver::Version::new(1, 0, 0)), "../dev/A"));

        let registry = Registry::from_packages("r", vec![]);
        let mut solution_versions = BTreeMap::new();
        solution_versions.insert(a, semver::Version::new(1, 0, 0));
        let solution = Solution { versions: solution_versions };

        let deps = build_manifest_entries(&solution, &registry, &existing).unwrap();
        assert!(matches!(&deps[&a].source, SourceKind::Path(p) if p == "../dev/A"));
    }
}
