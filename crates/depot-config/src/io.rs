//! Atomic load/write of the project+manifest pair, and environment activation.

use std::path::{Path, PathBuf};

use toml::value::Value;

use crate::error::ConfigError;
use crate::manifest::Manifest;
use crate::ordering::{reorder_table, MANIFEST_KEY_ORDER, PROJECT_KEY_ORDER};
use crate::project::Project;

const PROJECT_NAMES: [&str; 2] = ["Project.toml", "JuliaProject.toml"];
const MANIFEST_NAMES: [&str; 2] = ["Manifest.toml", "JuliaManifest.toml"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvState {
    Fresh,
    Loaded,
    Mutated,
    Written,
}

/// An in-memory handle on one environment's project+manifest pair,
/// tracking enough state to skip writes when nothing actually changed.
pub struct EnvCache {
    pub project_path: PathBuf,
    pub manifest_path: PathBuf,
    pub project: Project,
    pub manifest: Manifest,
    state: EnvState,
    original_project_toml: Option<String>,
    original_manifest_toml: Option<String>,
}

impl EnvCache {
    /// Locate and parse the `Project.toml`/`JuliaProject.toml` and its
    /// companion manifest under `env_path`. If no manifest exists yet, an
    /// empty one is synthesized (first-ever resolve of a fresh project).
    ///
    /// # Errors
    /// Returns an error if no project file exists, or either file fails to
    /// parse, or the project fails its structural invariants.
    pub fn load(env_path: &Path) -> Result<Self, ConfigError> {
        let (project_path, manifest_name) = find_project_file(env_path)?;

        let project_text = std::fs::read_to_string(&project_path).map_err(|source| ConfigError::Read {
            path: project_path.display().to_string(),
            source,
        })?;
        let project: Project = toml::from_str(&project_text).map_err(|source| ConfigError::Parse {
            path: project_path.display().to_string(),
            source,
        })?;
        project.validate()?;

        let manifest_path = env_path.join(manifest_name);
        let (manifest, original_manifest_toml) = if manifest_path.exists() {
            let text = std::fs::read_to_string(&manifest_path).map_err(|source| ConfigError::Read {
                path: manifest_path.display().to_string(),
                source,
            })?;
            let manifest = deserialize_manifest(&text, &manifest_path)?;
            (manifest, Some(text))
        } else {
            (Manifest::default(), None)
        };

        Ok(EnvCache {
            project_path,
            manifest_path,
            project,
            manifest,
            state: EnvState::Loaded,
            original_project_toml: Some(project_text),
            original_manifest_toml,
        })
    }

    /// Mark the cache as mutated. Callers must call this after changing
    /// `project` or `manifest` in place so `write` knows to re-serialize.
    pub fn mark_mutated(&mut self) {
        if self.state == EnvState::Loaded || self.state == EnvState::Fresh {
            self.state = EnvState::Mutated;
        }
    }

    /// Serialize and atomically write both documents, skipping any document
    /// whose serialized form is byte-identical to what was last read (or
    /// written) — spec.md §4.A's "skip writing unchanged documents".
    ///
    /// # Errors
    /// Returns an error if serialization or the atomic write fails.
    pub fn write(&mut self) -> Result<(), ConfigError> {
        let project_toml = serialize_project(&self.project, &self.project_path)?;
        if self.original_project_toml.as_deref() != Some(project_toml.as_str()) {
            depot_util::fs::write_atomic(&self.project_path, project_toml.as_bytes())
                .map_err(|source| ConfigError::Write {
                    path: self.project_path.display().to_string(),
                    source: io_error(&source),
                })?;
            self.original_project_toml = Some(project_toml);
        }

        let manifest_toml = serialize_manifest(&self.manifest, &self.manifest_path)?;
        if self.original_manifest_toml.as_deref() != Some(manifest_toml.as_str()) {
            depot_util::fs::write_atomic(&self.manifest_path, manifest_toml.as_bytes())
                .map_err(|source| ConfigError::Write {
                    path: self.manifest_path.display().to_string(),
                    source: io_error(&source),
                })?;
            self.original_manifest_toml = Some(manifest_toml);
        }

        self.state = EnvState::Written;
        Ok(())
    }
}

fn io_error(err: &depot_util::UtilError) -> std::io::Error {
    std::io::Error::other(err.to_string())
}

fn find_project_file(env_path: &Path) -> Result<(PathBuf, &'static str), ConfigError> {
    for (i, name) in PROJECT_NAMES.iter().enumerate() {
        let candidate = env_path.join(name);
        if candidate.exists() {
            return Ok((candidate, MANIFEST_NAMES[i]));
        }
    }
    Err(ConfigError::ProjectNotFound {
        path: env_path.display().to_string(),
    })
}

fn serialize_project(project: &Project, path: &Path) -> Result<String, ConfigError> {
    let value = toml::Value::try_from(project).map_err(|source| ConfigError::Serialize {
        path: path.display().to_string(),
        source,
    })?;
    let Value::Table(table) = value else {
        return Ok(String::new());
    };
    let ordered = reorder_table(table, PROJECT_KEY_ORDER);
    toml::to_string_pretty(&ordered).map_err(|source| ConfigError::Serialize {
        path: path.display().to_string(),
        source,
    })
}

fn serialize_manifest(manifest: &Manifest, path: &Path) -> Result<String, ConfigError> {
    let value = toml::Value::try_from(manifest).map_err(|source| ConfigError::Serialize {
        path: path.display().to_string(),
        source,
    })?;
    let Value::Table(mut table) = value else {
        return Ok(String::new());
    };

    // Re-key `deps` (a `uuid -> entry` table coming out of serde) into
    // `name -> [entries]` groups sorted by name then uuid, per spec.md §6.
    if let Some(Value::Table(deps_by_uuid)) = table.remove("deps") {
        let mut entries: Vec<(String, Value)> = deps_by_uuid.into_iter().collect();
        entries.sort_by(|a, b| {
            let name_a = a.1.get("name").and_then(Value::as_str).unwrap_or_default();
            let name_b = b.1.get("name").and_then(Value::as_str).unwrap_or_default();
            name_a.cmp(name_b).then_with(|| a.0.cmp(&b.0))
        });

        let mut by_name: toml::value::Table = toml::value::Table::new();
        for (_uuid, entry) in entries {
            let name = entry
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            by_name
                .entry(name)
                .or_insert_with(|| Value::Array(Vec::new()))
                .as_array_mut()
                .map(|arr| arr.push(entry));
        }
        table.insert("deps".to_owned(), Value::Table(by_name));
    }

    let ordered = reorder_table(table, MANIFEST_KEY_ORDER);
    toml::to_string_pretty(&ordered).map_err(|source| ConfigError::Serialize {
        path: path.display().to_string(),
        source,
    })
}

/// Parse a `Manifest.toml`/`JuliaManifest.toml` document, undoing
/// `serialize_manifest`'s `name -> [entries]` regrouping so the result
/// deserializes into `Manifest`'s `uuid -> entry` field.
fn deserialize_manifest(text: &str, path: &Path) -> Result<Manifest, ConfigError> {
    let parse_err = |source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    };

    let value: Value = toml::from_str(text).map_err(parse_err)?;
    let Value::Table(mut table) = value else {
        return Ok(Manifest::default());
    };

    if let Some(Value::Table(by_name)) = table.remove("deps") {
        let mut by_uuid = toml::value::Table::new();
        for (_name, grouped) in by_name {
            let entries: Vec<Value> = match grouped {
                Value::Array(arr) => arr,
                other => vec![other],
            };
            for entry in entries {
                if let Some(uuid_str) = entry.get("uuid").and_then(Value::as_str) {
                    by_uuid.insert(uuid_str.to_owned(), entry);
                }
            }
        }
        table.insert("deps".to_owned(), Value::Table(by_uuid));
    }

    let text = toml::to_string(&Value::Table(table)).map_err(|source| ConfigError::Serialize {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&text).map_err(parse_err)
}

/// How to resolve the environment to activate (spec.md §4.A `activate`).
pub enum ActivateTarget {
    /// Search each depot's `environments/` directory; create in the first
    /// depot if absent.
    Shared(String),
    /// Create a fresh temporary directory.
    Temp,
    /// An existing directory, or a to-be-created path.
    Path(PathBuf),
}

/// Process-external state `activate` needs: the depot search path and the
/// currently active project (if any), so dev-tracked-name resolution works.
/// Modeled as an explicit context rather than a global — only the CLI's
/// entry point installs a process-wide default built from one of these.
pub struct ActivateContext<'a> {
    pub depots: &'a [PathBuf],
    pub active_project: Option<&'a Project>,
    pub active_project_deps: &'a std::collections::BTreeMap<String, PathBuf>,
}

/// Resolve an activation target to a concrete environment directory,
/// creating it if `target` calls for that.
///
/// # Errors
/// Returns an error if a `Shared` target's name cannot be created in any
/// configured depot, or a `Path` target cannot be created.
pub fn activate(ctx: &ActivateContext<'_>, target: ActivateTarget) -> Result<PathBuf, ConfigError> {
    match target {
        ActivateTarget::Shared(name) => {
            for depot in ctx.depots {
                let candidate = depot.join("environments").join(&name);
                if candidate.exists() {
                    return Ok(candidate);
                }
            }
            let first = ctx.depots.first().ok_or_else(|| ConfigError::ProjectNotFound {
                path: format!("environments/{name}"),
            })?;
            let created = first.join("environments").join(&name);
            depot_util::fs::ensure_dir(&created).map_err(|e| ConfigError::Write {
                path: created.display().to_string(),
                source: io_error(&e),
            })?;
            Ok(created)
        }
        ActivateTarget::Temp => {
            let tmp = std::env::temp_dir().join(format!("depot-env-{}", uuid::Uuid::new_v4()));
            depot_util::fs::ensure_dir(&tmp).map_err(|e| ConfigError::Write {
                path: tmp.display().to_string(),
                source: io_error(&e),
            })?;
            Ok(tmp)
        }
        ActivateTarget::Path(path) => {
            if path.exists() {
                return Ok(path);
            }
            if let Some(resolved) = ctx.active_project_deps.get(&path.display().to_string()) {
                return Ok(resolved.clone());
            }
            depot_util::fs::ensure_dir(&path).map_err(|e| ConfigError::Write {
                path: path.display().to_string(),
                source: io_error(&e),
            })?;
            Ok(path)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn load_missing_project_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let result = EnvCache::load(tmp.path());
        assert!(matches!(result, Err(ConfigError::ProjectNotFound { .. })));
    }

    #[test]
    fn load_synthesizes_empty_manifest_when_absent() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("Project.toml"), "name = \"Foo\"\nuuid = \"00000000-0000-0000-0000-000000000001\"\nversion = \"0.1.0\"\n").unwrap();

        let cache = EnvCache::load(tmp.path()).unwrap();
        assert!(cache.manifest.deps.is_empty());
    }

    #[test]
    fn write_is_noop_when_unchanged() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("Project.toml"), "name = \"Foo\"\nuuid = \"00000000-0000-0000-0000-000000000001\"\nversion = \"0.1.0\"\n").unwrap();

        let mut cache = EnvCache::load(tmp.path()).unwrap();
        cache.write().unwrap();
        let manifest_mtime_before = fs::metadata(&cache.manifest_path);
        assert!(manifest_mtime_before.is_err(), "no manifest should have been written for an empty manifest diff from nothing");
    }

    #[test]
    fn write_creates_manifest_after_mutation() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("Project.toml"), "name = \"Foo\"\nuuid = \"00000000-0000-0000-0000-000000000001\"\nversion = \"0.1.0\"\n").unwrap();

        let mut cache = EnvCache::load(tmp.path()).unwrap();
        cache.manifest.project_hash = Some("abc".to_owned());
        cache.mark_mutated();
        cache.write().unwrap();

        assert!(cache.manifest_path.exists());
        let text = fs::read_to_string(&cache.manifest_path).unwrap();
        assert!(text.starts_with("manifest_format") || text.contains("project_hash"));
    }

    #[test]
    fn manifest_with_deps_round_trips_through_write_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("Project.toml"), "name = \"Foo\"\nuuid = \"00000000-0000-0000-0000-000000000001\"\nversion = \"0.1.0\"\n").unwrap();

        let mut cache = EnvCache::load(tmp.path()).unwrap();
        let uuid = uuid::Uuid::from_u128(2);
        cache.manifest.deps.insert(
            uuid,
            crate::manifest::ManifestEntry::registry("Example", uuid, semver::Version::new(1, 0, 0), [7u8; 20]),
        );
        cache.manifest.project_hash = Some("abc".to_owned());
        cache.mark_mutated();
        cache.write().unwrap();

        let reloaded = EnvCache::load(tmp.path()).unwrap();
        assert_eq!(reloaded.manifest.deps.len(), 1);
        assert_eq!(reloaded.manifest.deps.get(&uuid).map(|e| e.name.as_str()), Some("Example"));
    }

    #[test]
    fn activate_temp_creates_directory() {
        let depots = vec![];
        let deps = std::collections::BTreeMap::new();
        let ctx = ActivateContext {
            depots: &depots,
            active_project: None,
            active_project_deps: &deps,
        };
        let path = activate(&ctx, ActivateTarget::Temp).unwrap();
        assert!(path.exists());
    }
}
