//! The declared state of an environment: `Project.toml` / `JuliaProject.toml`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::compat::CompatExpr;
use crate::error::ConfigError;

/// A non-registry source pin for a declared dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePin {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdir: Option<String>,
}

/// The declared state of an environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<semver::Version>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub deps: BTreeMap<String, Uuid>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub compat: BTreeMap<String, CompatExpr>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, Uuid>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub targets: BTreeMap<String, Vec<String>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, SourcePin>,

    /// Opaque passthrough of any unrecognized top-level keys.
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl Project {
    /// `true` if the project declares `name`, `uuid`, and `version` and is
    /// therefore itself installable as a package.
    #[must_use]
    pub fn is_package(&self) -> bool {
        self.name.is_some() && self.uuid.is_some() && self.version.is_some()
    }

    /// Check the structural invariants spec.md §3 demands of a Project.
    ///
    /// # Errors
    /// Returns the first violated invariant found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(name) = &self.name {
            if !is_valid_identifier(name) {
                return Err(ConfigError::InvalidName { name: name.clone() });
            }
        }

        let package_fields = [
            ("name", self.name.is_some()),
            ("uuid", self.uuid.is_some()),
            ("version", self.version.is_some()),
        ];
        let declared_count = package_fields.iter().filter(|(_, present)| *present).count();
        if declared_count != 0 && declared_count != 3 {
            let (field, _) = package_fields
                .iter()
                .find(|(_, present)| *present)
                .unwrap_or(&("name", false));
            return Err(ConfigError::IncompletePackageIdentity { field });
        }

        let mut seen_uuids = std::collections::HashSet::new();
        for uuid in self.deps.values() {
            if !seen_uuids.insert(*uuid) {
                return Err(ConfigError::DuplicateDepUuid { uuid: *uuid });
            }
        }

        for name in self.compat.keys() {
            if name != "julia" && !self.deps.contains_key(name) && !self.extras.contains_key(name) {
                return Err(ConfigError::UnknownCompatTarget { name: name.clone() });
            }
        }

        for (target, names) in &self.targets {
            for name in names {
                if !self.deps.contains_key(name) && !self.extras.contains_key(name) {
                    return Err(ConfigError::UnknownTargetDep {
                        target: target.clone(),
                        name: name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Recompute the project hash covering `deps` + `compat` (see
    /// `depot_full_spec` open question #2 — `extras`/`targets` are
    /// deliberately excluded).
    #[must_use]
    pub fn project_hash(&self) -> String {
        let mut dep_parts: Vec<String> = self
            .deps
            .iter()
            .map(|(name, uuid)| format!("{name}={uuid}"))
            .collect();
        dep_parts.sort();

        let mut compat_parts: Vec<String> = self
            .compat
            .iter()
            .map(|(name, expr)| format!("{name}={}", expr.as_str()))
            .collect();
        compat_parts.sort();

        let joined_deps = dep_parts.join(";");
        let joined_compat = compat_parts.join(";");
        depot_util::hash::sha256_multi(&[&joined_deps, &joined_compat])
    }
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
