//! On-disk shape of one package's registry descriptor, and its in-memory
//! counterpart after parsing.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::RegistryError;
use depot_util::hash::parse_tree_hash;

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    uuid: Uuid,
    name: String,
    #[serde(default)]
    repo_url: Option<String>,
    #[serde(default)]
    versions: BTreeMap<String, RawVersion>,
}

#[derive(Debug, Deserialize)]
struct RawVersion {
    #[serde(rename = "tree_hash")]
    tree_hash: String,
    #[serde(default)]
    yanked: bool,
    #[serde(default)]
    compat: BTreeMap<String, String>,
}

/// One registered version of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageVersionInfo {
    pub tree_hash: [u8; 20],
    /// dependency UUID (as text, since deps aren't always themselves
    /// resolvable to a readable name at this layer) → version requirement.
    pub compat: BTreeMap<Uuid, semver::VersionReq>,
    pub yanked: bool,
}

/// A package as known to one registry source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub uuid: Uuid,
    pub name: String,
    pub repo_url: Option<String>,
    pub versions: BTreeMap<semver::Version, PackageVersionInfo>,
}

/// Parse one package descriptor TOML document.
///
/// # Errors
/// Returns an error if the document fails to parse, any tree hash is
/// malformed, or any compat range is unparseable.
pub fn parse_descriptor(path_for_errors: &str, text: &str) -> Result<PackageInfo, RegistryError> {
    let raw: RawDescriptor = toml::from_str(text).map_err(|source| RegistryError::Parse {
        path: path_for_errors.to_owned(),
        source,
    })?;

    let mut versions = BTreeMap::new();
    for (version_str, raw_version) in raw.versions {
        let version = semver::Version::parse(&version_str).map_err(|source| RegistryError::Parse {
            path: path_for_errors.to_owned(),
            source: toml::de::Error::custom(format!("invalid version \"{version_str}\": {source}")),
        })?;
        let tree_hash = parse_tree_hash(&raw_version.tree_hash).ok_or_else(|| {
            RegistryError::InvalidCompatRange {
                uuid: raw.uuid,
                version: version_str.clone(),
                range: raw_version.tree_hash.clone(),
                reason: "not a 40-character hex tree hash".to_owned(),
            }
        })?;

        let mut compat = BTreeMap::new();
        for (dep_uuid_str, range_str) in raw_version.compat {
            let dep_uuid = Uuid::parse_str(&dep_uuid_str).map_err(|_| RegistryError::InvalidCompatRange {
                uuid: raw.uuid,
                version: version_str.clone(),
                range: dep_uuid_str.clone(),
                reason: "dependency key is not a valid UUID".to_owned(),
            })?;
            let range = semver::VersionReq::parse(&range_str).map_err(|source| {
                RegistryError::InvalidCompatRange {
                    uuid: raw.uuid,
                    version: version_str.clone(),
                    range: range_str.clone(),
                    reason: source.to_string(),
                }
            })?;
            compat.insert(dep_uuid, range);
        }

        versions.insert(
            version,
            PackageVersionInfo {
                tree_hash,
                compat,
                yanked: raw_version.yanked,
            },
        );
    }

    Ok(PackageInfo {
        uuid: raw.uuid,
        name: raw.name,
        repo_url: raw.repo_url,
        versions,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
        uuid = "7876af07-990d-54b4-ab0e-23690620f79a"
        name = "Example"
        repo_url = "https://github.com/owner/Example.jl.git"

        [versions."0.5.3"]
        tree_hash = "0000000000000000000000000000000000000a"
        yanked = false
    "#;

    #[test]
    fn parses_basic_descriptor() {
        let info = parse_descriptor("example.toml", EXAMPLE).unwrap();
        assert_eq!(info.name, "Example");
        assert_eq!(info.versions.len(), 1);
        assert!(!info
            .versions
            .get(&semver::Version::new(0, 5, 3))
            .unwrap()
            .yanked);
    }

    #[test]
    fn rejects_bad_tree_hash() {
        let bad = r#"
            uuid = "7876af07-990d-54b4-ab0e-23690620f79a"
            name = "Example"
            [versions."0.1.0"]
            tree_hash = "not-hex"
        "#;
        assert!(parse_descriptor("bad.toml", bad).is_err());
    }
}
