#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod depots;
mod env;
mod error;
mod resolve;
mod usage;

use commands::up::PreserveLevelArg;
use error::CliError;

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "depot", about = "A UUID-keyed package manager")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve (creating if necessary) an environment and print its path
    Activate {
        /// Activate a depot-wide named environment instead of a path
        #[arg(long, conflicts_with_all = ["temp", "path"])]
        shared: Option<String>,
        /// Activate a fresh temporary environment
        #[arg(long, conflicts_with_all = ["shared", "path"])]
        temp: bool,
        /// Directory to activate (created if absent)
        #[arg(conflicts_with_all = ["shared", "temp"])]
        path: Option<PathBuf>,
    },
    /// Add one or more packages as direct dependencies
    Add {
        /// Environment directory (defaults to the current directory)
        #[arg(long)]
        project: Option<PathBuf>,
        /// Package specs: Name, Name@version, or Name=uuid
        specs: Vec<String>,
    },
    /// Remove one or more direct dependencies
    Rm {
        #[arg(long)]
        project: Option<PathBuf>,
        names: Vec<String>,
    },
    /// Re-resolve dependencies, optionally loosening preservation
    Up {
        #[arg(long)]
        project: Option<PathBuf>,
        /// How much of the current manifest to preserve while re-resolving
        #[arg(long, value_enum, default_value = "tiered")]
        preserve: PreserveLevelArg,
        /// Restrict the update to these packages (default: everything)
        names: Vec<String>,
    },
    /// Exempt a dependency's resolved version from future re-resolves
    Pin {
        #[arg(long)]
        project: Option<PathBuf>,
        names: Vec<String>,
    },
    /// Undo a previous `pin`
    Free {
        #[arg(long)]
        project: Option<PathBuf>,
        names: Vec<String>,
    },
    /// View or edit `[compat]` entries
    Compat {
        #[arg(long)]
        project: Option<PathBuf>,
        /// Name=range assignments; omit to list current entries
        assignments: Vec<String>,
    },
    /// Show direct dependencies and their resolved versions
    Status {
        #[arg(long)]
        project: Option<PathBuf>,
    },
    /// Sweep every configured depot for unreachable packages and artifacts
    Gc,
    /// Download everything the manifest (or a fresh resolve) names
    Instantiate {
        #[arg(long)]
        project: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Command::Activate { shared, temp, path } => {
            let target = if let Some(name) = shared {
                commands::activate::Target::Shared(name)
            } else if temp {
                commands::activate::Target::Temp
            } else {
                commands::activate::Target::Path(path.unwrap_or(PathBuf::from(".")))
            };
            commands::activate::run(target)
        }
        Command::Add { project, specs } => commands::add::run(project.as_deref(), &specs),
        Command::Rm { project, names } => commands::rm::run(project.as_deref(), &names),
        Command::Up { project, preserve, names } => commands::up::run(project.as_deref(), &names, preserve),
        Command::Pin { project, names } => commands::pin::pin(project.as_deref(), &names),
        Command::Free { project, names } => commands::pin::free(project.as_deref(), &names),
        Command::Compat { project, assignments } => commands::compat::run(project.as_deref(), &assignments),
        Command::Status { project } => commands::status::run(project.as_deref()),
        Command::Gc => commands::gc::run(),
        Command::Instantiate { project } => commands::instantiate::run(project.as_deref()),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn no_subcommand_shows_help() {
        let result = Cli::try_parse_from(["depot"]);
        assert!(matches!(result, Err(e) if e.kind() == ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        let result = Cli::try_parse_from(["depot", "frobnicate"]);
        assert!(matches!(result, Err(e) if e.kind() == ErrorKind::InvalidSubcommand));
    }

    #[test]
    fn help_flag_displays_help() {
        let result = Cli::try_parse_from(["depot", "--help"]);
        assert!(matches!(result, Err(e) if e.kind() == ErrorKind::DisplayHelp));
    }

    #[test]
    fn version_flag_displays_version() {
        let result = Cli::try_parse_from(["depot", "--version"]);
        assert!(matches!(result, Err(e) if e.kind() == ErrorKind::DisplayVersion));
    }

    #[test]
    fn add_accepts_bare_names() {
        let cli = Cli::try_parse_from(["depot", "add", "Example", "Other@1.2.3"]).unwrap();
        match cli.command {
            Command::Add { specs, project } => {
                assert_eq!(specs, vec!["Example", "Other@1.2.3"]);
                assert!(project.is_none());
            }
            other => panic!("expected Add, got {other:?}"),
        }
    }

    #[test]
    fn add_accepts_project_override() {
        let cli = Cli::try_parse_from(["depot", "add", "--project", "/tmp/env", "Example"]).unwrap();
        match cli.command {
            Command::Add { project, .. } => assert_eq!(project, Some(PathBuf::from("/tmp/env"))),
            other => panic!("expected Add, got {other:?}"),
        }
    }

    #[test]
    fn up_defaults_preserve_to_tiered() {
        let cli = Cli::try_parse_from(["depot", "up"]).unwrap();
        match cli.command {
            Command::Up { preserve, .. } => assert!(matches!(preserve, PreserveLevelArg::Tiered)),
            other => panic!("expected Up, got {other:?}"),
        }
    }

    #[test]
    fn up_rejects_unknown_preserve_level() {
        let result = Cli::try_parse_from(["depot", "up", "--preserve", "bogus"]);
        assert!(matches!(result, Err(e) if e.kind() == ErrorKind::InvalidValue));
    }

    #[test]
    fn activate_rejects_combining_shared_and_temp() {
        let result = Cli::try_parse_from(["depot", "activate", "--shared", "v1", "--temp"]);
        assert!(matches!(result, Err(e) if e.kind() == ErrorKind::ArgumentConflict));
    }

    #[test]
    fn gc_takes_no_arguments() {
        let result = Cli::try_parse_from(["depot", "gc", "extra"]);
        assert!(matches!(result, Err(e) if e.kind() == ErrorKind::UnknownArgument));
    }

    #[test]
    fn rm_collects_multiple_names() {
        let cli = Cli::try_parse_from(["depot", "rm", "A", "B", "C"]).unwrap();
        match cli.command {
            Command::Rm { names, .. } => assert_eq!(names, vec!["A", "B", "C"]),
            other => panic!("expected Rm, got {other:?}"),
        }
    }
}
