//! The constraint-satisfaction solver itself (spec.md §4.C "Solve").
//!
//! Per-UUID domains are first simplified by arc consistency (discard any
//! version with no existential support for one of its own dependency
//! ranges), then searched by chronological backtracking, preferring the
//! highest version of each UUID and tie-breaking by discovery order then
//! name.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::error::ResolverError;
use crate::graph::Graph;
use crate::types::Solution;

/// Reduce `domains` to a fixpoint: drop any (uuid, version) whose
/// dependency ranges have no supporting version left in the target's
/// domain. Returns an error naming the first domain that is emptied.
fn arc_consistency(
    graph: &Graph,
    domains: &mut BTreeMap<Uuid, Vec<semver::Version>>,
) -> Result<(), ResolverError> {
    loop {
        let mut changed = false;

        let uuids: Vec<Uuid> = domains.keys().copied().collect();
        for uuid in uuids {
            let mut keep = Vec::new();
            for version in domains[&uuid].clone() {
                let node = &graph.nodes[&uuid][&version];
                let mut supported = true;
                for (dep_uuid, range) in &node.deps {
                    let has_support = domains
                        .get(dep_uuid)
                        .is_some_and(|dep_domain| dep_domain.iter().any(|v| range.matches(v)));
                    if !has_support {
                        supported = false;
                        break;
                    }
                }
                if supported {
                    keep.push(version);
                }
            }
            if keep.len() != domains[&uuid].len() {
                changed = true;
            }
            if keep.is_empty() && !domains[&uuid].is_empty() {
                return Err(ResolverError::EmptyDomain {
                    uuid,
                    name: graph.name_of(uuid),
                });
            }
            domains.insert(uuid, keep);
        }

        if !changed {
            return Ok(());
        }
    }
}

fn consistent(
    graph: &Graph,
    uuid: Uuid,
    version: &semver::Version,
    assignment: &BTreeMap<Uuid, semver::Version>,
) -> bool {
    let node = &graph.nodes[&uuid][version];
    for (dep_uuid, range) in &node.deps {
        if let Some(assigned) = assignment.get(dep_uuid) {
            if !range.matches(assigned) {
                return false;
            }
        }
    }
    for (other_uuid, other_version) in assignment {
        if let Some(other_node) = graph.nodes.get(other_uuid).and_then(|m| m.get(other_version)) {
            if let Some(range) = other_node.deps.get(&uuid) {
                if !range.matches(version) {
                    return false;
                }
            }
        }
    }
    true
}

fn backtrack(
    graph: &Graph,
    vars: &[Uuid],
    idx: usize,
    domains: &BTreeMap<Uuid, Vec<semver::Version>>,
    assignment: &mut BTreeMap<Uuid, semver::Version>,
) -> bool {
    if idx == vars.len() {
        return true;
    }
    let uuid = vars[idx];
    for version in &domains[&uuid] {
        if consistent(graph, uuid, version, assignment) {
            assignment.insert(uuid, version.clone());
            if backtrack(graph, vars, idx + 1, domains, assignment) {
                return true;
            }
            assignment.remove(&uuid);
        }
    }
    false
}

/// Deterministic variable order: discovery order, tie-broken by name
/// ascending (spec.md §4.C step 2).
fn variable_order(graph: &Graph) -> Vec<Uuid> {
    let mut order = graph.discovery_order.clone();
    order.sort_by(|a, b| graph.name_of(*a).cmp(&graph.name_of(*b)).then(a.cmp(b)));
    order
}

/// Solve the graph, honoring an optional per-UUID domain restriction
/// (`pinned`) used by the tiered preservation driver. Absent entries use
/// the node's full candidate list. Every domain is additionally
/// intersected against `graph.root_ranges`, so a root requirement's
/// compat range — including an exact-version pin from `depot add
/// Name@version` — is enforced here rather than left for the caller.
///
/// # Errors
/// `ResolverError::EmptyDomain` if arc consistency empties a domain;
/// `ResolverError::Conflict` if no assignment satisfies every edge.
pub fn solve(
    graph: &Graph,
    pinned: &BTreeMap<Uuid, Vec<semver::Version>>,
) -> Result<Solution, ResolverError> {
    let mut domains: BTreeMap<Uuid, Vec<semver::Version>> = BTreeMap::new();
    for (uuid, versions) in &graph.nodes {
        let mut candidates: Vec<semver::Version> = match pinned.get(uuid) {
            Some(restricted) => restricted
                .iter()
                .filter(|v| versions.contains_key(v))
                .cloned()
                .collect(),
            None => versions.keys().cloned().collect(),
        };
        if let Some(ranges) = graph.root_ranges.get(uuid) {
            candidates.retain(|v| ranges.iter().all(|range| range.matches(v)));
        }
        candidates.sort_by(|a, b| b.cmp(a));
        if candidates.is_empty() {
            return Err(ResolverError::EmptyDomain {
                uuid: *uuid,
                name: graph.name_of(*uuid),
            });
        }
        domains.insert(*uuid, candidates);
    }

    arc_consistency(graph, &mut domains)?;

    let vars = variable_order(graph);
    let mut assignment = BTreeMap::new();
    if backtrack(graph, &vars, 0, &domains, &mut assignment) {
        Ok(Solution {
            versions: assignment,
        })
    } else {
        let mut names: Vec<String> = vars.iter().map(|u| graph.name_of(*u)).collect();
        names.sort();
        Err(ResolverError::Conflict {
            names,
            detail: "no combination of candidate versions satisfies every compat range".to_owned(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::graph::GraphInput;
    use crate::types::RootRequirement;
    use depot_registry::{PackageInfo, PackageVersionInfo, Registry};
    use std::collections::BTreeMap as Map;

    fn uuid_n(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn pkg(uuid: Uuid, name: &str, versions: Vec<(&str, Map<Uuid, semver::VersionReq>)>) -> PackageInfo {
        PackageInfo {
            uuid,
            name: name.to_owned(),
            repo_url: None,
            versions: versions
                .into_iter()
                .map(|(v, deps)| {
                    (
                        semver::Version::parse(v).unwrap(),
                        PackageVersionInfo {
                            tree_hash: [1; 20],
                            compat: deps,
                            yanked: false,
                        },
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn picks_highest_satisfying_version() {
        let a = uuid_n(1);
        let registry = Registry::from_packages(
            "r",
            vec![pkg(
                a,
                "A",
                vec![("1.0.0", Map::new()), ("1.1.0", Map::new()), ("2.0.0", Map::new())],
            )],
        );
        let roots = vec![RootRequirement {
            uuid: a,
            name: "A".to_owned(),
            range: semver::VersionReq::parse("^1").unwrap(),
        }];
        let stdlibs = Map::new();
        let graph = crate::graph::build_graph(&GraphInput {
            registry: &registry,
            roots: &roots,
            fixed: &[],
            stdlibs: &stdlibs,
            offline: false,
            is_downloaded: &|_, _| true,
        })
        .unwrap();

        // No `pinned` restriction at all — the root's own `^1` range must be
        // what excludes 2.0.0, proving `root_ranges` is consulted by `solve`
        // itself rather than only by a hand-built `pinned` map.
        let solution = solve(&graph, &Map::new()).unwrap();
        assert_eq!(solution.versions[&a], semver::Version::new(1, 1, 0));
    }

    #[test]
    fn root_range_rejects_a_version_outside_its_compat_range() {
        let a = uuid_n(1);
        let registry = Registry::from_packages("r", vec![pkg(a, "A", vec![("2.0.0", Map::new())])]);
        let roots = vec![RootRequirement {
            uuid: a,
            name: "A".to_owned(),
            range: semver::VersionReq::parse("^1").unwrap(),
        }];
        let stdlibs = Map::new();
        let graph = crate::graph::build_graph(&GraphInput {
            registry: &registry,
            roots: &roots,
            fixed: &[],
            stdlibs: &stdlibs,
            offline: false,
            is_downloaded: &|_, _| true,
        })
        .unwrap();

        let result = solve(&graph, &Map::new());
        assert!(matches!(result, Err(ResolverError::EmptyDomain { uuid, .. }) if uuid == a));
    }

    #[test]
    fn root_range_honors_an_exact_version_pin() {
        // Mirrors `depot add Name@version`: `resolve.rs::build_roots` turns
        // the pin into an exact-version `RootRequirement.range`.
        let a = uuid_n(1);
        let registry = Registry::from_packages(
            "r",
            vec![pkg(a, "A", vec![("1.0.0", Map::new()), ("1.1.0", Map::new())])],
        );
        let roots = vec![RootRequirement {
            uuid: a,
            name: "A".to_owned(),
            range: semver::VersionReq::parse("=1.0.0").unwrap(),
        }];
        let stdlibs = Map::new();
        let graph = crate::graph::build_graph(&GraphInput {
            registry: &registry,
            roots: &roots,
            fixed: &[],
            stdlibs: &stdlibs,
            offline: false,
            is_downloaded: &|_, _| true,
        })
        .unwrap();

        let solution = solve(&graph, &Map::new()).unwrap();
        assert_eq!(solution.versions[&a], semver::Version::new(1, 0, 0));
    }

    #[test]
    fn conflicting_ranges_on_shared_dependency_fail() {
        // A requires C >= 2, B requires C < 2.
        let a = uuid_n(1);
        let b = uuid_n(2);
        let c = uuid_n(3);

        let mut a_deps = Map::new();
        a_deps.insert(c, semver::VersionReq::parse(">=2.0.0").unwrap());
        let mut b_deps = Map::new();
        b_deps.insert(c, semver::VersionReq::parse("<2.0.0").unwrap());

        let registry = Registry::from_packages(
            "r",
            vec![
                pkg(a, "A", vec![("1.0.0", a_deps)]),
                pkg(b, "B", vec![("1.0.0", b_deps)]),
                pkg(c, "C", vec![("1.0.0", Map::new()), ("2.0.0", Map::new())]),
            ],
        );

        let roots = vec![
            RootRequirement {
                uuid: a,
                name: "A".to_owned(),
                range: semver::VersionReq::STAR,
            },
            RootRequirement {
                uuid: b,
                name: "B".to_owned(),
                range: semver::VersionReq::STAR,
            },
        ];
        let stdlibs = Map::new();
        let graph = crate::graph::build_graph(&GraphInput {
            registry: &registry,
            roots: &roots,
            fixed: &[],
            stdlibs: &stdlibs,
            offline: false,
            is_downloaded: &|_, _| true,
        })
        .unwrap();

        let result = solve(&graph, &Map::new());
        assert!(result.is_err());
    }

    #[test]
    fn dependency_resolution_respects_compat_edge() {
        let a = uuid_n(1);
        let b = uuid_n(2);
        let mut a_deps = Map::new();
        a_deps.insert(b, semver::VersionReq::parse("^1").unwrap());

        let registry = Registry::from_packages(
            "r",
            vec![
                pkg(a, "A", vec![("1.0.0", a_deps)]),
                pkg(b, "B", vec![("1.0.0", Map::new()), ("2.0.0", Map::new())]),
            ],
        );
        let roots = vec![RootRequirement {
            uuid: a,
            name: "A".to_owned(),
            range: semver::VersionReq::STAR,
        }];
        let stdlibs = Map::new();
        let graph = crate::graph::build_graph(&GraphInput {
            registry: &registry,
            roots: &roots,
            fixed: &[],
            stdlibs: &stdlibs,
            offline: false,
            is_downloaded: &|_, _| true,
        })
        .unwrap();

        let solution = solve(&graph, &Map::new()).unwrap();
        assert_eq!(solution.versions[&b], semver::Version::new(1, 0, 0));
    }
}
