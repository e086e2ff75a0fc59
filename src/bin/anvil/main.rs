//! anvil CLI - test and build a D project across a compiler matrix

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use anvil::core::AnvilError;
use anvil::util::diagnostic::emit;
use anvil::util::{GlobalContext, Shell};

mod cli;
mod commands;

use cli::{Cli, Command};

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("anvil=debug")
    } else {
        EnvFilter::new("anvil=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let shell = Arc::new(Shell::from_flags(cli.quiet, cli.verbose, cli.color));

    if let Err(e) = run(cli, &shell) {
        let code = match e.downcast_ref::<AnvilError>() {
            Some(err) => {
                emit(&err.to_diagnostic(), shell.use_color());
                err.exit_code()
            }
            None => {
                eprintln!("error: {:#}", e);
                1
            }
        };
        std::process::exit(code);
    }
}

fn run(cli: Cli, shell: &Arc<Shell>) -> Result<()> {
    let command = cli.command.into_command()?;
    let ctx = GlobalContext::new()?.with_config(cli.config);

    // Execute command
    match command {
        Command::InstallDeps => commands::install_deps::execute(&ctx, shell),
        Command::Build(compiler, args) => commands::build::execute(&ctx, compiler, args, shell),
        Command::Plan(args) => commands::plan::execute(&ctx, args),
    }
}
