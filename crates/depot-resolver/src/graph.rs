//! BFS graph construction from root requirements and fixed nodes out to
//! every transitively reachable UUID (spec.md §4.C "Graph construction").

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use uuid::Uuid;

use crate::error::ResolverError;
use crate::types::{FixedNode, RootRequirement, StdlibNode};
use depot_registry::Registry;

/// One candidate version of one UUID in the graph.
#[derive(Debug, Clone)]
pub struct VersionNode {
    /// `None` only for dev-tracked fixed nodes, which carry no tree hash.
    pub tree_hash: Option<[u8; 20]>,
    pub deps: BTreeMap<Uuid, semver::VersionReq>,
}

/// The full constraint graph: every reachable UUID, its candidate
/// versions, and their dependency edges.
#[derive(Debug)]
pub struct Graph {
    pub nodes: BTreeMap<Uuid, BTreeMap<semver::Version, VersionNode>>,
    pub names: BTreeMap<Uuid, String>,
    /// BFS discovery order, used to tie-break the search variable order.
    pub discovery_order: Vec<Uuid>,
    /// Every root requirement's compat range, keyed by UUID. `solve`
    /// intersects a UUID's domain against all of these before searching —
    /// more than one entry for the same UUID means more than one root
    /// requirement named it, and every range must hold at once.
    pub root_ranges: BTreeMap<Uuid, Vec<semver::VersionReq>>,
}

impl Graph {
    #[must_use]
    pub fn name_of(&self, uuid: Uuid) -> String {
        self.names
            .get(&uuid)
            .cloned()
            .unwrap_or_else(|| uuid.to_string())
    }
}

/// Inputs needed to BFS the full reachable graph.
pub struct GraphInput<'a> {
    pub registry: &'a Registry,
    pub roots: &'a [RootRequirement],
    pub fixed: &'a [FixedNode],
    pub stdlibs: &'a BTreeMap<Uuid, StdlibNode>,
    /// Forbid every version not already present in the content store —
    /// used for offline mode.
    pub offline: bool,
    pub is_downloaded: &'a dyn Fn(Uuid, &semver::Version) -> bool,
}

/// BFS the registry starting from `input.roots` and `input.fixed`,
/// synthesizing single-version nodes for stdlibs and fixed deps, and
/// enumerating registry versions (filtering yanked, and — offline —
/// not-yet-downloaded versions) for everything else.
///
/// # Errors
/// Returns an error if a reachable UUID is registered nowhere and is
/// neither fixed nor a known stdlib, or if configured registries
/// disagree on a tree hash.
pub fn build_graph(input: &GraphInput<'_>) -> Result<Graph, ResolverError> {
    let fixed_by_uuid: BTreeMap<Uuid, &FixedNode> =
        input.fixed.iter().map(|f| (f.uuid, f)).collect();

    let mut nodes: BTreeMap<Uuid, BTreeMap<semver::Version, VersionNode>> = BTreeMap::new();
    let mut names: BTreeMap<Uuid, String> = BTreeMap::new();
    let mut discovery_order = Vec::new();
    let mut queued: BTreeSet<Uuid> = BTreeSet::new();
    let mut queue: VecDeque<Uuid> = VecDeque::new();
    let mut root_ranges: BTreeMap<Uuid, Vec<semver::VersionReq>> = BTreeMap::new();

    for root in input.roots {
        root_ranges.entry(root.uuid).or_default().push(root.range.clone());
        if queued.insert(root.uuid) {
            queue.push_back(root.uuid);
        }
    }
    for fixed in input.fixed {
        if queued.insert(fixed.uuid) {
            queue.push_back(fixed.uuid);
        }
    }

    while let Some(uuid) = queue.pop_front() {
        discovery_order.push(uuid);

        let mut deps_to_enqueue: Vec<Uuid> = Vec::new();

        if let Some(fixed) = fixed_by_uuid.get(&uuid) {
            names.insert(uuid, fixed.name.clone());
            let mut versions = BTreeMap::new();
            versions.insert(
                fixed.version.clone(),
                VersionNode {
                    tree_hash: fixed.tree_hash,
                    deps: fixed.deps.clone(),
                },
            );
            deps_to_enqueue.extend(fixed.deps.keys().copied());
            nodes.insert(uuid, versions);
        } else if let Some(stdlib) = input.stdlibs.get(&uuid) {
            names.insert(uuid, stdlib.name.clone());
            let mut versions = BTreeMap::new();
            versions.insert(
                stdlib.version.clone(),
                VersionNode {
                    tree_hash: None,
                    deps: stdlib.deps.clone(),
                },
            );
            deps_to_enqueue.extend(stdlib.deps.keys().copied());
            nodes.insert(uuid, versions);
        } else {
            let info = input
                .registry
                .lookup(uuid)?
                .ok_or(ResolverError::UnknownDependency { uuid })?;
            names.insert(uuid, info.name.clone());

            let mut versions = BTreeMap::new();
            for (version, version_info) in &info.versions {
                if version_info.yanked {
                    continue;
                }
                if input.offline && !(input.is_downloaded)(uuid, version) {
                    continue;
                }
                deps_to_enqueue.extend(version_info.compat.keys().copied());
                versions.insert(
                    version.clone(),
                    VersionNode {
                        tree_hash: Some(version_info.tree_hash),
                        deps: version_info.compat.clone(),
                    },
                );
            }
            nodes.insert(uuid, versions);
        }

        for dep_uuid in deps_to_enqueue {
            if queued.insert(dep_uuid) {
                queue.push_back(dep_uuid);
            }
        }
    }

    Ok(Graph {
        nodes,
        names,
        discovery_order,
        root_ranges,
    })
}
