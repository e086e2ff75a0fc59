//! CLI definitions using clap.

use std::path::PathBuf;

use anvil::core::matrix::BuildMode;
use anvil::core::{AnvilError, CompilerSpec};
use anvil::util::shell::ColorChoice;
use clap::{Args, Parser, Subcommand};

/// Prefix of the per-toolchain build commands (`build-dmd`, `build-ldc`, ...)
const BUILD_PREFIX: &str = "build-";

/// anvil - test and build a D project across a compiler matrix
#[derive(Parser)]
#[command(name = "anvil")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors and failed cells
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    /// Path to anvil.toml (default: search upward from the current directory)
    #[arg(long, global = true, env = "ANVIL_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install system packages and clone auxiliary sources
    InstallDeps,

    /// Show the build matrix without running anything
    Plan(PlanArgs),

    /// `build-<toolchain>`: install a compiler, then test and build the matrix
    #[command(external_subcommand)]
    External(Vec<String>),
}

/// A dispatched command.
pub enum Command {
    InstallDeps,
    Build(CompilerSpec, BuildArgs),
    Plan(PlanArgs),
}

impl Commands {
    /// Resolve `build-<toolchain>`; anything else unknown is an error.
    pub fn into_command(self) -> Result<Command, AnvilError> {
        match self {
            Commands::InstallDeps => Ok(Command::InstallDeps),
            Commands::Plan(args) => Ok(Command::Plan(args)),
            Commands::External(argv) => {
                let name = argv.first().cloned().unwrap_or_default();
                let unknown = || AnvilError::UnknownCommand { name: name.clone() };

                let toolchain = name.strip_prefix(BUILD_PREFIX).ok_or_else(unknown)?;
                let spec: CompilerSpec = toolchain.parse().map_err(|_| unknown())?;

                let args = BuildArgs::try_parse_from(
                    std::iter::once(format!("anvil {}", name)).chain(argv.into_iter().skip(1)),
                )
                .unwrap_or_else(|e| e.exit());

                let spec = match &args.pin {
                    Some(version) => spec.with_version(version),
                    None => spec,
                };
                Ok(Command::Build(spec, args))
            }
        }
    }
}

/// Axis selection shared by `build-<toolchain>` and `plan`.
#[derive(Args, Debug, Clone, Default)]
pub struct MatrixArgs {
    /// Only these architectures (repeatable)
    #[arg(long = "arch", value_name = "ARCH")]
    pub arch: Vec<String>,

    /// Only these configurations (repeatable)
    #[arg(short = 'c', long = "configuration", value_name = "NAME")]
    pub configuration: Vec<String>,

    /// Only these build modes (repeatable)
    #[arg(short = 'm', long = "mode", value_name = "MODE")]
    pub mode: Vec<BuildMode>,
}

/// Arguments of `anvil build-<toolchain>`.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Install this compiler version instead of the latest
    #[arg(long, value_name = "VERSION")]
    pub pin: Option<String>,

    /// Use the compiler already on PATH; skip the installer
    #[arg(long)]
    pub no_install: bool,

    #[command(flatten)]
    pub matrix: MatrixArgs,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Compiler to plan for
    #[arg(long, default_value = "dmd")]
    pub compiler: String,

    /// Emit one JSON object per cell
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub matrix: MatrixArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, AnvilError> {
        Cli::try_parse_from(args).unwrap().command.into_command()
    }

    #[test]
    fn test_build_toolchain_command() {
        match parse(&["anvil", "build-ldc", "--pin", "1.30.0", "--mode", "release"]).unwrap() {
            Command::Build(spec, args) => {
                assert_eq!(spec.installer_id(), "ldc-1.30.0");
                assert_eq!(args.matrix.mode, [BuildMode::Release]);
                assert!(!args.no_install);
            }
            _ => panic!("expected build command"),
        }
    }

    #[test]
    fn test_build_with_version_in_name() {
        match parse(&["anvil", "build-dmd-2.100.0"]).unwrap() {
            Command::Build(spec, _) => assert_eq!(spec.installer_id(), "dmd-2.100.0"),
            _ => panic!("expected build command"),
        }
    }

    #[test]
    fn test_unknown_command() {
        match parse(&["anvil", "deploy"]) {
            Err(AnvilError::UnknownCommand { name }) => assert_eq!(name, "deploy"),
            _ => panic!("expected unknown command"),
        }
        assert!(matches!(
            parse(&["anvil", "build-"]),
            Err(AnvilError::UnknownCommand { .. })
        ));
    }

    #[test]
    fn test_plan_args() {
        match parse(&["anvil", "--quiet", "plan", "--json", "--arch", "x86"]).unwrap() {
            Command::Plan(args) => {
                assert!(args.json);
                assert_eq!(args.compiler, "dmd");
                assert_eq!(args.matrix.arch, ["x86"]);
            }
            _ => panic!("expected plan command"),
        }
    }
}
