//! `depot compat [Name=range ...]` — print or edit `[compat]` entries.
//! With no arguments, lists every currently declared compat range;
//! otherwise each `Name=range` argument is parsed and written back.

use std::path::Path;

use depot_config::{CompatExpr, EnvCache};

use crate::env::resolve_project_dir;
use crate::error::CliError;

fn parse_assignment(raw: &str) -> Result<(String, String), CliError> {
    raw.split_once('=').map(|(n, r)| (n.to_owned(), r.to_owned())).ok_or_else(|| CliError::InvalidSpec {
        spec: raw.to_owned(),
        reason: "expected Name=range".to_owned(),
    })
}

/// # Errors
/// Returns an error if the project cannot be located, an assignment is
/// malformed, or a range fails to parse or targets an unknown dependency.
pub fn run(project: Option<&Path>, assignments: &[String]) -> Result<(), CliError> {
    let project_dir = resolve_project_dir(project)?;
    let mut env = EnvCache::load(&project_dir)?;

    if assignments.is_empty() {
        for (name, expr) in &env.project.compat {
            println!("{name} = \"{}\"", expr.as_str());
        }
        return Ok(());
    }

    for raw in assignments {
        let (name, range) = parse_assignment(raw)?;
        let expr = CompatExpr::parse(&name, &range)?;
        env.project.compat.insert(name, expr);
    }
    env.project.validate()?;
    env.mark_mutated();
    env.write()?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_assignment_splits_on_equals() {
        let (name, range) = parse_assignment("Example=1.2").unwrap();
        assert_eq!(name, "Example");
        assert_eq!(range, "1.2");
    }

    #[test]
    fn parse_assignment_rejects_missing_equals() {
        assert!(matches!(parse_assignment("Example"), Err(CliError::InvalidSpec { .. })));
    }

    #[test]
    fn run_rejects_compat_for_unknown_target() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("Project.toml"), "").unwrap();
        let result = run(Some(tmp.path()), &["Ghost=1.0".to_owned()]);
        assert!(result.is_err());
    }
}
