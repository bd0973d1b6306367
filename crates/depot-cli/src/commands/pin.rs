//! `depot pin` / `depot free` — toggle a manifest entry's `pinned` flag,
//! exempting it from future re-resolves without touching its version.

use std::path::Path;

use depot_config::EnvCache;

use crate::env::resolve_project_dir;
use crate::error::CliError;

fn set_pinned(project: Option<&Path>, names: &[String], pinned: bool) -> Result<(), CliError> {
    let project_dir = resolve_project_dir(project)?;
    let mut env = EnvCache::load(&project_dir)?;

    for name in names {
        let uuid = *env.project.deps.get(name).ok_or_else(|| CliError::NotADirectDependency { name: name.clone() })?;
        let entry = env.manifest.deps.get_mut(&uuid).ok_or_else(|| CliError::NotADirectDependency { name: name.clone() })?;
        entry.pinned = pinned;
    }

    env.mark_mutated();
    env.write()?;

    let verb = if pinned { "Pinned" } else { "Freed" };
    for name in names {
        eprintln!("    {verb} {name}");
    }
    Ok(())
}

/// # Errors
/// Returns an error if the project cannot be located or any name is not a
/// direct, already-resolved dependency.
pub fn pin(project: Option<&Path>, names: &[String]) -> Result<(), CliError> {
    set_pinned(project, names, true)
}

/// # Errors
/// Returns an error if the project cannot be located or any name is not a
/// direct, already-resolved dependency.
pub fn free(project: Option<&Path>, names: &[String]) -> Result<(), CliError> {
    set_pinned(project, names, false)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use depot_config::ManifestEntry;

    #[test]
    fn pin_then_free_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let uuid = uuid::Uuid::from_u128(1);
        std::fs::write(
            tmp.path().join("Project.toml"),
            format!("[deps]\nExample = \"{uuid}\"\n"),
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("Manifest.toml"),
            format!(
                "manifest_format = \"1.0\"\n\n[[deps.Example]]\nname = \"Example\"\nuuid = \"{uuid}\"\nversion = \"1.0.0\"\ngit-tree-sha1 = \"{}\"\n",
                "0".repeat(40)
            ),
        )
        .unwrap();

        pin(Some(tmp.path()), &["Example".to_owned()]).unwrap();
        let env = EnvCache::load(tmp.path()).unwrap();
        assert!(env.manifest.deps.get(&uuid).map(|e: &ManifestEntry| e.pinned).unwrap_or(false));

        free(Some(tmp.path()), &["Example".to_owned()]).unwrap();
        let env = EnvCache::load(tmp.path()).unwrap();
        assert!(!env.manifest.deps.get(&uuid).map(|e: &ManifestEntry| e.pinned).unwrap_or(true));
    }
}
