//! Shared input/output types for graph construction and solving.

use std::collections::BTreeMap;

use uuid::Uuid;

/// One of the six preservation levels a resolve may be invoked at.
///
/// Ordered here from strictest to loosest, matching the spec's own
/// ordering; `Tiered` (the default) tries `All`, then `Direct`, then
/// `Semver`, then `None` in turn, and `TieredInstalled` prepends
/// `AllInstalled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreserveLevel {
    AllInstalled,
    All,
    Direct,
    Semver,
    None,
    Tiered,
    TieredInstalled,
}

impl Default for PreserveLevel {
    fn default() -> Self {
        PreserveLevel::Tiered
    }
}

/// A root requirement contributed by the active project's own `deps` +
/// `compat` sections.
#[derive(Debug, Clone)]
pub struct RootRequirement {
    pub uuid: Uuid,
    pub name: String,
    pub range: semver::VersionReq,
}

/// Why a node's version is fixed rather than chosen by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedKind {
    /// A `path`-pinned dev dependency; version and deps come from its
    /// own project file, and it carries no tree hash.
    Dev,
    /// A `repo.source` + `repo.rev`-pinned dependency; its tree hash is
    /// computed from the checked-out tree.
    Repo,
    /// A manifest entry with `pinned = true`; immune to every
    /// preservation tier, not just the ones that happen to already keep
    /// its version.
    Pinned,
}

/// A node the resolver must not change — pinned, dev-tracked, or
/// repo-tracked.
#[derive(Debug, Clone)]
pub struct FixedNode {
    pub uuid: Uuid,
    pub name: String,
    pub version: semver::Version,
    pub tree_hash: Option<[u8; 20]>,
    pub deps: BTreeMap<Uuid, semver::VersionReq>,
    pub kind: FixedKind,
}

/// A single-version node synthesized for a UUID known to the host
/// runtime (a stdlib) but absent from every configured registry.
#[derive(Debug, Clone)]
pub struct StdlibNode {
    pub uuid: Uuid,
    pub name: String,
    pub version: semver::Version,
    pub deps: BTreeMap<Uuid, semver::VersionReq>,
}

/// The chosen version for every UUID reachable from the roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub versions: BTreeMap<Uuid, semver::Version>,
}
