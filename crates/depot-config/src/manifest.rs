//! The resolved state of an environment: `Manifest.toml` / `JuliaManifest.toml`.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::ConfigError;
use depot_util::hash::{parse_tree_hash, tree_hash_hex};

/// Where a manifest entry's content comes from. Exactly one of these three
/// shapes applies to any entry (spec.md §3's "source kind" invariant) —
/// modeled as a tagged union rather than nullable fields so invalid
/// combinations are unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// A registry- or repo-tracked package installed at a known tree hash.
    TreeHash([u8; 20]),
    /// A dev-tracked dependency living at a filesystem path.
    Path(String),
    /// A versionless standard-library package with neither.
    Stdlib,
}

/// Git tracking info for a repo-tracked manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub source: String,
    pub rev: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdir: Option<String>,
}

/// The resolved record for one package in one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub name: String,
    pub uuid: Uuid,
    pub version: Option<semver::Version>,
    pub source: SourceKind,
    pub repo: Option<RepoInfo>,
    pub pinned: bool,
    /// Local (non-recursive) view of this entry's direct dependencies.
    pub deps: BTreeMap<String, Uuid>,
    pub extra: toml::Table,
}

impl ManifestEntry {
    /// Build a registry-backed entry (source kind `TreeHash`).
    #[must_use]
    pub fn registry(name: impl Into<String>, uuid: Uuid, version: semver::Version, tree_hash: [u8; 20]) -> Self {
        ManifestEntry {
            name: name.into(),
            uuid,
            version: Some(version),
            source: SourceKind::TreeHash(tree_hash),
            repo: None,
            pinned: false,
            deps: BTreeMap::new(),
            extra: toml::Table::new(),
        }
    }

    /// Build a dev-tracked, path-based entry.
    #[must_use]
    pub fn dev(name: impl Into<String>, uuid: Uuid, version: Option<semver::Version>, path: impl Into<String>) -> Self {
        ManifestEntry {
            name: name.into(),
            uuid,
            version,
            source: SourceKind::Path(path.into()),
            repo: None,
            pinned: false,
            deps: BTreeMap::new(),
            extra: toml::Table::new(),
        }
    }

    /// Build a versionless stdlib entry.
    #[must_use]
    pub fn stdlib(name: impl Into<String>, uuid: Uuid) -> Self {
        ManifestEntry {
            name: name.into(),
            uuid,
            version: None,
            source: SourceKind::Stdlib,
            repo: None,
            pinned: false,
            deps: BTreeMap::new(),
            extra: toml::Table::new(),
        }
    }
}

/// An internal serde mirror used only to (de)serialize `ManifestEntry`'s
/// tagged `source` into the flat on-disk shape (`tree_hash` or `path`, never
/// both).
#[derive(Serialize, Deserialize)]
struct ManifestEntryRepr {
    name: String,
    uuid: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<semver::Version>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "git-tree-sha1")]
    tree_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repo: Option<RepoInfo>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pinned: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    deps: BTreeMap<String, Uuid>,
    #[serde(flatten)]
    extra: toml::Table,
}

impl Serialize for ManifestEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (tree_hash, path) = match &self.source {
            SourceKind::TreeHash(hash) => (Some(tree_hash_hex(hash)), None),
            SourceKind::Path(path) => (None, Some(path.clone())),
            SourceKind::Stdlib => (None, None),
        };
        ManifestEntryRepr {
            name: self.name.clone(),
            uuid: self.uuid,
            version: self.version.clone(),
            tree_hash,
            path,
            repo: self.repo.clone(),
            pinned: self.pinned,
            deps: self.deps.clone(),
            extra: self.extra.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ManifestEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = ManifestEntryRepr::deserialize(deserializer)?;
        let source = match (repr.tree_hash, repr.path) {
            (Some(hash), None) => {
                let bytes = parse_tree_hash(&hash).ok_or_else(|| {
                    D::Error::custom(format!("invalid tree hash \"{hash}\""))
                })?;
                SourceKind::TreeHash(bytes)
            }
            (None, Some(path)) => SourceKind::Path(path),
            (None, None) => SourceKind::Stdlib,
            (Some(_), Some(_)) => {
                return Err(D::Error::custom(
                    "manifest entry cannot have both git-tree-sha1 and path",
                ))
            }
        };
        Ok(ManifestEntry {
            name: repr.name,
            uuid: repr.uuid,
            version: repr.version,
            source,
            repo: repr.repo,
            pinned: repr.pinned,
            deps: repr.deps,
            extra: repr.extra,
        })
    }
}

/// The resolved state of an environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub julia_version: Option<semver::Version>,
    pub manifest_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_hash: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub deps: BTreeMap<Uuid, ManifestEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        Manifest {
            julia_version: None,
            manifest_format: "1.0".to_owned(),
            project_hash: None,
            deps: BTreeMap::new(),
        }
    }
}

impl Manifest {
    /// Prune every entry not reachable from `roots` via transitive `deps`
    /// (manifest invariant P2 / spec.md §3's reachability rule).
    pub fn prune_unreachable(&mut self, roots: &BTreeMap<String, Uuid>) {
        let mut live: std::collections::HashSet<Uuid> = std::collections::HashSet::new();
        let mut stack: Vec<Uuid> = roots.values().copied().collect();
        while let Some(uuid) = stack.pop() {
            if !live.insert(uuid) {
                continue;
            }
            if let Some(entry) = self.deps.get(&uuid) {
                stack.extend(entry.deps.values().copied());
            }
        }
        self.deps.retain(|uuid, _| live.contains(uuid));
    }

    /// Validate manifest-entry invariants: dangling local deps, at-most-one
    /// source kind (already enforced by the type), each entry's `deps`
    /// values present elsewhere in the manifest.
    ///
    /// `known_stdlibs` covers unregistered host-runtime stdlibs that may be
    /// referenced without a corresponding manifest entry.
    ///
    /// # Errors
    /// Returns the first dangling dependency found.
    pub fn validate(&self, known_stdlibs: &std::collections::HashSet<Uuid>) -> Result<(), ConfigError> {
        for entry in self.deps.values() {
            for dep_uuid in entry.deps.values() {
                if !self.deps.contains_key(dep_uuid) && !known_stdlibs.contains(dep_uuid) {
                    return Err(ConfigError::DanglingManifestDep {
                        name: entry.name.clone(),
                        uuid: entry.uuid,
                        dep_uuid: *dep_uuid,
                    });
                }
            }
        }
        Ok(())
    }
}
