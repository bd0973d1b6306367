//! Tiered preservation driver (spec.md §4.C "Preservation tiers").

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use crate::error::ResolverError;
use crate::graph::Graph;
use crate::solve::solve;
use crate::types::{PreserveLevel, Solution};

/// What the preservation tiers are allowed to look at: the previous
/// manifest's recorded versions, which UUIDs are direct root deps, and
/// (for `AllInstalled`) which versions are already present in the
/// content store.
pub struct TierContext<'a> {
    pub current_manifest: &'a BTreeMap<Uuid, semver::Version>,
    pub direct_uuids: &'a BTreeSet<Uuid>,
    pub is_installed: &'a dyn Fn(Uuid, &semver::Version) -> bool,
}

fn pin_all_installed(graph: &Graph, ctx: &TierContext<'_>) -> BTreeMap<Uuid, Vec<semver::Version>> {
    graph
        .nodes
        .iter()
        .map(|(uuid, versions)| {
            let installed: Vec<semver::Version> = versions
                .keys()
                .filter(|v| (ctx.is_installed)(*uuid, v))
                .cloned()
                .collect();
            (*uuid, installed)
        })
        .collect()
}

fn pin_all(ctx: &TierContext<'_>) -> BTreeMap<Uuid, Vec<semver::Version>> {
    ctx.current_manifest
        .iter()
        .map(|(uuid, version)| (*uuid, vec![version.clone()]))
        .collect()
}

fn pin_direct(ctx: &TierContext<'_>) -> BTreeMap<Uuid, Vec<semver::Version>> {
    ctx.current_manifest
        .iter()
        .filter(|(uuid, _)| ctx.direct_uuids.contains(uuid))
        .map(|(uuid, version)| (*uuid, vec![version.clone()]))
        .collect()
}

fn pin_semver(graph: &Graph, ctx: &TierContext<'_>) -> BTreeMap<Uuid, Vec<semver::Version>> {
    let mut pinned = BTreeMap::new();
    for uuid in ctx.direct_uuids {
        let Some(current) = ctx.current_manifest.get(uuid) else {
            continue;
        };
        let Some(range) = semver::VersionReq::parse(&current.to_string()).ok() else {
            continue;
        };
        if let Some(versions) = graph.nodes.get(uuid) {
            let compatible: Vec<semver::Version> = versions
                .keys()
                .filter(|v| range.matches(v))
                .cloned()
                .collect();
            pinned.insert(*uuid, compatible);
        }
    }
    pinned
}

/// Run one resolve at a single, concrete preservation level (no
/// recursion into `Tiered`/`TieredInstalled`).
fn solve_at_level(
    graph: &Graph,
    level: PreserveLevel,
    ctx: &TierContext<'_>,
) -> Result<Solution, ResolverError> {
    let pinned = match level {
        PreserveLevel::AllInstalled => pin_all_installed(graph, ctx),
        PreserveLevel::All => pin_all(ctx),
        PreserveLevel::Direct => pin_direct(ctx),
        PreserveLevel::Semver => pin_semver(graph, ctx),
        PreserveLevel::None => BTreeMap::new(),
        PreserveLevel::Tiered | PreserveLevel::TieredInstalled => {
            unreachable!("tiered levels are driven by `resolve_with_preservation`")
        }
    };
    solve(graph, &pinned)
}

/// Resolve `graph` at `level`, driving the tiered fallback chain when
/// `level` is `Tiered` or `TieredInstalled`.
///
/// A `ResolverConflict` (empty domain or no satisfying assignment) at
/// one tier is caught and the next looser tier is tried; any other
/// error propagates immediately, matching spec.md §7's error taxonomy.
///
/// # Errors
/// The last tier's error, if every tier fails.
pub fn resolve_with_preservation(
    graph: &Graph,
    level: PreserveLevel,
    ctx: &TierContext<'_>,
) -> Result<Solution, ResolverError> {
    match level {
        PreserveLevel::Tiered => {
            let mut last_err = None;
            for tier in [
                PreserveLevel::All,
                PreserveLevel::Direct,
                PreserveLevel::Semver,
                PreserveLevel::None,
            ] {
                match solve_at_level(graph, tier, ctx) {
                    Ok(solution) => return Ok(solution),
                    Err(err) if err.is_resolver_conflict() => last_err = Some(err),
                    Err(err) => return Err(err),
                }
            }
            Err(last_err.expect("at least one tier runs"))
        }
        PreserveLevel::TieredInstalled => {
            match solve_at_level(graph, PreserveLevel::AllInstalled, ctx) {
                Ok(solution) => Ok(solution),
                Err(err) if err.is_resolver_conflict() => {
                    resolve_with_preservation(graph, PreserveLevel::Tiered, ctx)
                }
                Err(err) => Err(err),
            }
        }
        level => solve_at_level(graph, level, ctx),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::graph::{build_graph, GraphInput};
    use crate::types::RootRequirement;
    use depot_registry::{PackageInfo, PackageVersionInfo, Registry};
    use std::collections::BTreeMap as Map;

    fn uuid_n(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn pkg(uuid: Uuid, name: &str, versions: &[&str]) -> PackageInfo {
        PackageInfo {
            uuid,
            name: name.to_owned(),
            repo_url: None,
            versions: versions
                .iter()
                .map(|v| {
                    (
                        semver::Version::parse(v).unwrap(),
                        PackageVersionInfo {
                            tree_hash: [1; 20],
                            compat: Map::new(),
                            yanked: false,
                        },
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn all_tier_keeps_existing_version_even_when_newer_exists() {
        let a = uuid_n(1);
        let registry = Registry::from_packages("r", vec![pkg(a, "A", &["1.0.0", "1.1.0"])]);
        let roots = vec![RootRequirement {
            uuid: a,
            name: "A".to_owned(),
            range: semver::VersionReq::STAR,
        }];
        let stdlibs = Map::new();
        let graph = build_graph(&GraphInput {
            registry: &registry,
            roots: &roots,
            fixed: &[],
            stdlibs: &stdlibs,
            offline: false,
            is_downloaded: &|_, _| true,
        })
        .unwrap();

        let mut current_manifest = Map::new();
        current_manifest.insert(a, semver::Version::new(1, 0, 0));
        let direct_uuids: BTreeSet<Uuid> = [a].into_iter().collect();
        let ctx = TierContext {
            current_manifest: &current_manifest,
            direct_uuids: &direct_uuids,
            is_installed: &|_, _| true,
        };

        let solution = resolve_with_preservation(&graph, PreserveLevel::All, &ctx).unwrap();
        assert_eq!(solution.versions[&a], semver::Version::new(1, 0, 0));
    }

    #[test]
    fn none_tier_picks_newest() {
        let a = uuid_n(1);
        let registry = Registry::from_packages("r", vec![pkg(a, "A", &["1.0.0", "1.1.0"])]);
        let roots = vec![RootRequirement {
            uuid: a,
            name: "A".to_owned(),
            range: semver::VersionReq::STAR,
        }];
        let stdlibs = Map::new();
        let graph = build_graph(&GraphInput {
            registry: &registry,
            roots: &roots,
            fixed: &[],
            stdlibs: &stdlibs,
            offline: false,
            is_downloaded: &|_, _| true,
        })
        .unwrap();

        let current_manifest = Map::new();
        let direct_uuids = BTreeSet::new();
        let ctx = TierContext {
            current_manifest: &current_manifest,
            direct_uuids: &direct_uuids,
            is_installed: &|_, _| true,
        };

        let solution = resolve_with_preservation(&graph, PreserveLevel::None, &ctx).unwrap();
        assert_eq!(solution.versions[&a], semver::Version::new(1, 1, 0));
    }

    #[test]
    fn tiered_falls_back_when_all_is_infeasible() {
        // A newly-added root (OtherPkg) has no current manifest entry, so
        // `All`'s pin set over `current_manifest` is unaffected by it, but a
        // freshly introduced package with *no* satisfying candidate at all
        // still forces every tier through to `None`.
        let a = uuid_n(1);
        let registry = Registry::from_packages("r", vec![pkg(a, "A", &["1.0.0"])]);
        let roots = vec![RootRequirement {
            uuid: a,
            name: "A".to_owned(),
            range: semver::VersionReq::STAR,
        }];
        let stdlibs = Map::new();
        let graph = build_graph(&GraphInput {
            registry: &registry,
            roots: &roots,
            fixed: &[],
            stdlibs: &stdlibs,
            offline: false,
            is_downloaded: &|_, _| true,
        })
        .unwrap();

        let current_manifest = Map::new();
        let direct_uuids: BTreeSet<Uuid> = [a].into_iter().collect();
        let ctx = TierContext {
            current_manifest: &current_manifest,
            direct_uuids: &direct_uuids,
            is_installed: &|_, _| true,
        };

        let solution = resolve_with_preservation(&graph, PreserveLevel::Tiered, &ctx).unwrap();
        assert_eq!(solution.versions[&a], semver::Version::new(1, 0, 0));
    }
}
