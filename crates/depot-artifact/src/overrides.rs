//! `Overrides.toml` (spec.md §4.E "Overrides"): by-hash redirects and
//! by-UUID+name rewrites, applied on read and never touched by GC.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::error::ArtifactError;

fn is_hex_tree_hash(s: &str) -> bool {
    s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Parsed `Overrides.toml` contents.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `<hex tree hash>` → absolute path or another hex tree hash.
    pub by_hash: BTreeMap<String, String>,
    /// `<package uuid>` → `{ artifact_name → path or hash }`.
    pub by_uuid: BTreeMap<Uuid, BTreeMap<String, String>>,
}

/// Parse an `Overrides.toml` file.
///
/// # Errors
/// Returns an error if a top-level key is neither a 40-character hex tree
/// hash nor a UUID, or a value doesn't have the shape its key implies.
pub fn parse_overrides(content: &str) -> Result<Overrides, ArtifactError> {
    let raw: toml::Value = toml::from_str(content).map_err(ArtifactError::InvalidToml)?;
    let table = raw.as_table().cloned().unwrap_or_default();

    let mut overrides = Overrides::default();
    for (key, value) in table {
        if is_hex_tree_hash(&key) {
            let target = value.as_str().ok_or_else(|| ArtifactError::InvalidOverrideValue { key: key.clone() })?;
            overrides.by_hash.insert(key, target.to_owned());
        } else if let Ok(uuid) = Uuid::parse_str(&key) {
            let sub = value
                .as_table()
                .ok_or_else(|| ArtifactError::InvalidOverrideValue { key: key.clone() })?;
            let mut names = BTreeMap::new();
            for (name, target) in sub {
                let target_str = target
                    .as_str()
                    .ok_or_else(|| ArtifactError::InvalidOverrideValue { key: key.clone() })?;
                names.insert(name.clone(), target_str.to_owned());
            }
            overrides.by_uuid.insert(uuid, names);
        } else {
            return Err(ArtifactError::InvalidOverrideKey { key });
        }
    }

    Ok(overrides)
}

/// Resolve a tree hash through any by-hash redirect chain, returning
/// either a final hex hash or an absolute path that replaces the install
/// path entirely.
#[must_use]
pub fn resolve_hash_override(overrides: &Overrides, hash_hex: &str) -> ResolvedOverride {
    let mut current = hash_hex.to_owned();
    let mut visited = std::collections::BTreeSet::new();

    loop {
        if !visited.insert(current.clone()) {
            // Cycle in the override chain: stop where we are.
            return ResolvedOverride::Hash(current);
        }
        match overrides.by_hash.get(&current) {
            Some(target) if is_hex_tree_hash(target) => current = target.clone(),
            Some(target) => return ResolvedOverride::Path(target.clone()),
            None => return ResolvedOverride::Hash(current),
        }
    }
}

/// The result of following a by-hash override chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedOverride {
    /// No override applied, or the chain terminated at another hash.
    Hash(String),
    /// The chain terminated at an absolute path that replaces the install
    /// path.
    Path(String),
}
