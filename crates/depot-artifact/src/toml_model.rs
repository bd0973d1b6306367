//! `Artifacts.toml` data model (spec.md §4.E "Artifacts.toml entries").

use std::collections::BTreeMap;

use depot_platform::Platform;
use serde::{Deserialize, Serialize};

use crate::error::ArtifactError;

/// One `{url, sha256, size?}` download source for an artifact entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadSource {
    pub url: String,
    pub sha256: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// A single platform variant (or the sole entry of a platform-independent
/// artifact).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "git-tree-sha1")]
    pub git_tree_sha1: String,
    #[serde(default)]
    pub lazy: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub download: Vec<DownloadSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Entry {
    /// The platform this entry is restricted to, or `None` for a
    /// platform-independent entry.
    #[must_use]
    pub fn platform(&self) -> Option<Platform> {
        let os = self.os.clone()?;
        let arch = self.arch.clone().unwrap_or_default();
        let mut platform = Platform::new(os, arch);
        for (key, value) in &self.extra {
            platform = platform.with_attr(key.clone(), value.clone());
        }
        Some(platform)
    }
}

/// A named artifact: either a single platform-independent table, or an
/// ordered sequence of platform variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryValue {
    Single(Entry),
    Multi(Vec<Entry>),
}

impl EntryValue {
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        match self {
            EntryValue::Single(entry) => std::slice::from_ref(entry),
            EntryValue::Multi(entries) => entries.as_slice(),
        }
    }

    fn from_entries(mut entries: Vec<Entry>) -> Self {
        if entries.len() == 1 {
            EntryValue::Single(entries.remove(0))
        } else {
            EntryValue::Multi(entries)
        }
    }
}

/// The full parsed contents of one package's `Artifacts.toml`.
pub type ArtifactsFile = BTreeMap<String, EntryValue>;

/// Parse an `Artifacts.toml` file.
///
/// # Errors
/// Returns an error if the content is not valid TOML matching the expected
/// shape.
pub fn parse_artifacts_toml(content: &str) -> Result<ArtifactsFile, ArtifactError> {
    toml::from_str(content).map_err(ArtifactError::InvalidToml)
}

/// Serialize an `Artifacts.toml` file back to its text form.
#[must_use]
pub fn to_toml_string(file: &ArtifactsFile) -> String {
    toml::to_string_pretty(file).unwrap_or_default()
}

/// Insert or replace the entry for `name`, preserving the platform
/// disjunction already present (spec.md §4.E `bind_artifact!`).
///
/// Fails with [`ArtifactError::NameCollision`] if an entry already exists
/// for the same platform (or lack thereof) unless `force` is set.
///
/// # Errors
/// Returns [`ArtifactError::NameCollision`] on an unforced collision.
pub fn bind_entry(file: &mut ArtifactsFile, name: &str, new_entry: Entry, force: bool) -> Result<(), ArtifactError> {
    let mut entries: Vec<Entry> = file.remove(name).map_or_else(Vec::new, |v| v.entries().to_vec());

    let new_platform = new_entry.platform();
    let collision = entries.iter().position(|e| e.platform() == new_platform);

    match collision {
        Some(idx) if force => {
            if let Some(slot) = entries.get_mut(idx) {
                *slot = new_entry;
            }
        }
        Some(_) => {
            file.insert(name.to_owned(), EntryValue::from_entries(entries));
            return Err(ArtifactError::NameCollision { name: name.to_owned() });
        }
        None => entries.push(new_entry),
    }

    file.insert(name.to_owned(), EntryValue::from_entries(entries));
    Ok(())
}
