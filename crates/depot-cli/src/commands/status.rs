//! `depot status` — list direct dependencies and their resolved versions,
//! flagging anything declared but not yet resolved.

use std::path::Path;

use depot_config::EnvCache;

use crate::env::resolve_project_dir;
use crate::error::CliError;

/// # Errors
/// Returns an error if the project cannot be located or fails to parse.
pub fn run(project: Option<&Path>) -> Result<(), CliError> {
    let project_dir = resolve_project_dir(project)?;
    let env = EnvCache::load(&project_dir)?;

    println!("Project {}", env.project_path.display());
    for (name, uuid) in &env.project.deps {
        match env.manifest.deps.get(uuid) {
            Some(entry) => {
                let pin_marker = if entry.pinned { " ⚲" } else { "" };
                match &entry.version {
                    Some(version) => println!("  [{}] {name} v{version}{pin_marker}", short_uuid(uuid)),
                    None => println!("  [{}] {name} (stdlib){pin_marker}", short_uuid(uuid)),
                }
            }
            None => println!("  [{}] {name} (not yet resolved)", short_uuid(uuid)),
        }
    }
    Ok(())
}

fn short_uuid(uuid: &uuid::Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn short_uuid_takes_first_segment() {
        let uuid = uuid::Uuid::from_u128(1);
        assert_eq!(short_uuid(&uuid).len(), 8);
    }

    #[test]
    fn run_succeeds_on_dependency_free_project() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("Project.toml"), "").unwrap();
        assert!(run(Some(tmp.path())).is_ok());
    }
}
