//! `depot activate` — resolve (creating if necessary) an environment
//! directory and print its path.
//!
//! spec.md's `activate` sets a process-wide "currently active project"
//! pointer a long-running REPL session holds across many commands. A
//! one-shot CLI invocation has no such session to hold it in, so this
//! prints the resolved path for the caller's shell to act on (e.g. `cd
//! "$(depot activate --shared Foo)"`) rather than mutating hidden state.

use std::collections::BTreeMap;
use std::path::PathBuf;

use depot_config::{activate as resolve_activation, ActivateContext, ActivateTarget};

use crate::depots::depot_search_path;
use crate::error::CliError;

/// Which environment `activate` should resolve to.
#[derive(Debug, Clone)]
pub enum Target {
    Shared(String),
    Temp,
    Path(PathBuf),
}

/// # Errors
/// Returns an error if no depot is configured, or the target environment
/// cannot be created.
pub fn run(target: Target) -> Result<(), CliError> {
    let depots = depot_search_path()?;
    let active_project_deps = BTreeMap::new();
    let ctx = ActivateContext {
        depots: &depots,
        active_project: None,
        active_project_deps: &active_project_deps,
    };

    let activate_target = match target {
        Target::Shared(name) => ActivateTarget::Shared(name),
        Target::Temp => ActivateTarget::Temp,
        Target::Path(path) => ActivateTarget::Path(path),
    };

    let resolved = resolve_activation(&ctx, activate_target)?;

    let project_path = resolved.join("Project.toml");
    if !project_path.exists() {
        depot_util::fs::write_atomic(&project_path, b"")?;
    }

    println!("{}", resolved.display());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn activate_temp_creates_a_fresh_project() {
        let _guard = ENV_LOCK.lock().unwrap();
        let depot_tmp = tempfile::tempdir().unwrap();
        std::env::set_var("DEPOT_PATH", depot_tmp.path());
        assert!(run(Target::Temp).is_ok());
        std::env::remove_var("DEPOT_PATH");
    }

    #[test]
    fn activate_shared_creates_named_environment() {
        let _guard = ENV_LOCK.lock().unwrap();
        let depot_tmp = tempfile::tempdir().unwrap();
        std::env::set_var("DEPOT_PATH", depot_tmp.path());
        assert!(run(Target::Shared("v1".to_owned())).is_ok());
        assert!(depot_tmp.path().join("environments").join("v1").join("Project.toml").exists());
        std::env::remove_var("DEPOT_PATH");
    }
}
