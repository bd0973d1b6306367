//! `PackageSpec`: the transient union type used as input/output of most
//! resolver and installer operations. Operations progressively refine a
//! spec; every refinement method returns a new value so callers never
//! mutate a spec another caller still holds a reference to.

use uuid::Uuid;

use crate::manifest::RepoInfo;

/// A partially or fully specified package reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: Option<String>,
    pub uuid: Option<Uuid>,
    pub version: Option<semver::Version>,
    pub tree_hash: Option<[u8; 20]>,
    pub repo: Option<RepoInfo>,
    pub path: Option<String>,
    pub pinned: bool,
    pub url: Option<String>,
    pub rev: Option<String>,
    pub subdir: Option<String>,
}

impl PackageSpec {
    /// A spec that names only a package by its human name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        PackageSpec {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// A spec that names only a package by its UUID.
    #[must_use]
    pub fn with_uuid(uuid: Uuid) -> Self {
        PackageSpec {
            uuid: Some(uuid),
            ..Default::default()
        }
    }

    /// Return a refined copy carrying the given version, leaving `self` untouched.
    #[must_use]
    pub fn refine_version(&self, version: semver::Version) -> Self {
        PackageSpec {
            version: Some(version),
            ..self.clone()
        }
    }

    /// Return a refined copy carrying the given tree hash, leaving `self` untouched.
    #[must_use]
    pub fn refine_tree_hash(&self, tree_hash: [u8; 20]) -> Self {
        PackageSpec {
            tree_hash: Some(tree_hash),
            ..self.clone()
        }
    }

    /// Return a refined copy pinned to a filesystem path (a dev-tracked dep).
    #[must_use]
    pub fn refine_path(&self, path: impl Into<String>) -> Self {
        PackageSpec {
            path: Some(path.into()),
            ..self.clone()
        }
    }

    /// `true` if this spec is anchored to a non-registry source (path or repo).
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        self.path.is_some() || self.repo.is_some() || self.pinned
    }
}
