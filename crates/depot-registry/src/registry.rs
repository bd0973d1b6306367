//! The read-only union view over one or more registry sources.

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use crate::descriptor::{parse_descriptor, PackageInfo};
use crate::error::RegistryError;
use depot_util::hash::tree_hash_hex;

struct Source {
    name: String,
    packages: BTreeMap<Uuid, PackageInfo>,
}

/// The union of every configured registry source.
///
/// If two sources disagree on the tree hash recorded for the same
/// `(uuid, version)` pair, that is treated as fatal (spec.md §4.B, open
/// question 1's stricter resolution) the moment the disagreement is
/// observed, during `lookup`.
pub struct Registry {
    sources: Vec<Source>,
}

impl Registry {
    /// Load a registry from a set of `(source_name, directory)` pairs, each
    /// directory holding one `<uuid>.toml` descriptor per package.
    ///
    /// # Errors
    /// Returns an error if any directory or descriptor cannot be read or
    /// parsed.
    pub fn from_dirs(dirs: &[(String, std::path::PathBuf)]) -> Result<Self, RegistryError> {
        let mut sources = Vec::with_capacity(dirs.len());
        for (name, dir) in dirs {
            let mut packages = BTreeMap::new();
            let entries = std::fs::read_dir(dir).map_err(|source| RegistryError::Read {
                path: dir.display().to_string(),
                source,
            })?;
            for entry in entries {
                let entry = entry.map_err(|source| RegistryError::Read {
                    path: dir.display().to_string(),
                    source,
                })?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                    continue;
                }
                let text = std::fs::read_to_string(&path).map_err(|source| RegistryError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                let info = parse_descriptor(&path.display().to_string(), &text)?;
                packages.insert(info.uuid, info);
            }
            sources.push(Source {
                name: name.clone(),
                packages,
            });
        }
        Ok(Registry { sources })
    }

    /// Build a registry directly from in-memory package lists — used by
    /// tests and by the resolver's own test suite.
    #[must_use]
    pub fn from_packages(name: impl Into<String>, packages: Vec<PackageInfo>) -> Self {
        Registry {
            sources: vec![Source {
                name: name.into(),
                packages: packages.into_iter().map(|p| (p.uuid, p)).collect(),
            }],
        }
    }

    /// Union multiple already-built registries into one.
    #[must_use]
    pub fn union(registries: Vec<Registry>) -> Self {
        Registry {
            sources: registries.into_iter().flat_map(|r| r.sources).collect(),
        }
    }

    /// Look up a package by UUID across every configured source.
    ///
    /// # Errors
    /// Returns `RegistryError::HashDisagreement` if two sources record
    /// different tree hashes for the same `(uuid, version)`.
    pub fn lookup(&self, uuid: Uuid) -> Result<Option<PackageInfo>, RegistryError> {
        let mut merged: Option<PackageInfo> = None;
        let mut owning_source: BTreeMap<semver::Version, String> = BTreeMap::new();

        for source in &self.sources {
            let Some(info) = source.packages.get(&uuid) else {
                continue;
            };
            match &mut merged {
                None => {
                    merged = Some(info.clone());
                    for version in info.versions.keys() {
                        owning_source.insert(version.clone(), source.name.clone());
                    }
                }
                Some(existing) => {
                    for (version, version_info) in &info.versions {
                        match existing.versions.get(version) {
                            Some(existing_version_info) => {
                                if existing_version_info.tree_hash != version_info.tree_hash {
                                    let first_source = owning_source
                                        .get(version)
                                        .cloned()
                                        .unwrap_or_default();
                                    return Err(RegistryError::HashDisagreement {
                                        uuid,
                                        version: version.to_string(),
                                        first_source,
                                        first_hash: tree_hash_hex(&existing_version_info.tree_hash),
                                        second_source: source.name.clone(),
                                        second_hash: tree_hash_hex(&version_info.tree_hash),
                                    });
                                }
                            }
                            None => {
                                existing.versions.insert(version.clone(), version_info.clone());
                                owning_source.insert(version.clone(), source.name.clone());
                            }
                        }
                    }
                    existing.repo_url = existing.repo_url.clone().or_else(|| info.repo_url.clone());
                }
            }
        }

        Ok(merged)
    }

    /// Every UUID registered under `name`, across all sources — used to
    /// disambiguate an add-by-name when more than one package shares it.
    #[must_use]
    pub fn uuids_for_name(&self, name: &str) -> BTreeSet<Uuid> {
        self.sources
            .iter()
            .flat_map(|s| s.packages.values())
            .filter(|p| p.name == name)
            .map(|p| p.uuid)
            .collect()
    }

    /// `true` if `version` is recorded as yanked for `info`.
    #[must_use]
    pub fn is_yanked(info: &PackageInfo, version: &semver::Version) -> bool {
        info.versions.get(version).is_some_and(|v| v.yanked)
    }

    /// The `{version -> {dep-uuid -> VersionSpec}}` compat map for a package,
    /// lazily materialized from its already-parsed versions.
    #[must_use]
    pub fn compat_info(
        info: &PackageInfo,
    ) -> BTreeMap<semver::Version, BTreeMap<Uuid, semver::VersionReq>> {
        info.versions
            .iter()
            .map(|(version, info)| (version.clone(), info.compat.clone()))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::descriptor::PackageVersionInfo;

    fn uuid_n(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn package(uuid: Uuid, name: &str, version: &str, hash_byte: u8) -> PackageInfo {
        let mut versions = BTreeMap::new();
        versions.insert(
            semver::Version::parse(version).unwrap(),
            PackageVersionInfo {
                tree_hash: [hash_byte; 20],
                compat: BTreeMap::new(),
                yanked: false,
            },
        );
        PackageInfo {
            uuid,
            name: name.to_owned(),
            repo_url: None,
            versions,
        }
    }

    #[test]
    fn lookup_finds_package_in_single_source() {
        let registry = Registry::from_packages("r1", vec![package(uuid_n(1), "Example", "0.5.3", 1)]);
        let info = registry.lookup(uuid_n(1)).unwrap().unwrap();
        assert_eq!(info.name, "Example");
    }

    #[test]
    fn lookup_returns_none_for_unknown_uuid() {
        let registry = Registry::from_packages("r1", vec![]);
        assert!(registry.lookup(uuid_n(99)).unwrap().is_none());
    }

    #[test]
    fn agreeing_sources_merge_versions() {
        let mut v2 = package(uuid_n(1), "Example", "0.6.0", 2);
        v2.versions.extend(package(uuid_n(1), "Example", "0.5.3", 1).versions);
        let registry = Registry::union(vec![
            Registry::from_packages("r1", vec![package(uuid_n(1), "Example", "0.5.3", 1)]),
            Registry::from_packages("r2", vec![v2]),
        ]);
        let info = registry.lookup(uuid_n(1)).unwrap().unwrap();
        assert_eq!(info.versions.len(), 2);
    }

    #[test]
    fn disagreeing_sources_are_fatal() {
        let registry = Registry::union(vec![
            Registry::from_packages("r1", vec![package(uuid_n(1), "Example", "0.5.3", 1)]),
            Registry::from_packages("r2", vec![package(uuid_n(1), "Example", "0.5.3", 2)]),
        ]);
        let result = registry.lookup(uuid_n(1));
        assert!(matches!(result, Err(RegistryError::HashDisagreement { .. })));
    }

    #[test]
    fn uuids_for_name_disambiguates() {
        let registry = Registry::union(vec![
            Registry::from_packages("r1", vec![package(uuid_n(1), "Dup", "1.0.0", 1)]),
            Registry::from_packages("r2", vec![package(uuid_n(2), "Dup", "1.0.0", 1)]),
        ]);
        let uuids = registry.uuids_for_name("Dup");
        assert_eq!(uuids.len(), 2);
    }

    #[test]
    fn is_yanked_reports_version_flag() {
        let mut pkg = package(uuid_n(1), "Example", "0.5.3", 1);
        pkg.versions.get_mut(&semver::Version::parse("0.5.3").unwrap()).unwrap().yanked = true;
        assert!(Registry::is_yanked(&pkg, &semver::Version::parse("0.5.3").unwrap()));
    }
}
