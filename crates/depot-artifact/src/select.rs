//! `select_downloadable_artifacts` (spec.md §4.E): the iteration used by
//! `add`/`instantiate` to decide what to fetch eagerly.

use std::collections::BTreeSet;

use depot_platform::Platform;

use crate::toml_model::{ArtifactsFile, Entry};

/// Yield every `(name, entry)` matching `platform` that is either
/// non-lazy, or lazy but explicitly named in `requested`.
#[must_use]
pub fn select_downloadable_artifacts<'a>(
    file: &'a ArtifactsFile,
    platform: &Platform,
    requested: &BTreeSet<String>,
) -> Vec<(&'a str, &'a Entry)> {
    let mut selected = Vec::new();
    for (name, value) in file {
        let Some(entry) = value.entries().iter().find(|e| e.platform().is_none_or(|p| p.matches(platform))) else {
            continue;
        };
        if !entry.lazy || requested.contains(name) {
            selected.push((name.as_str(), entry));
        }
    }
    selected
}
