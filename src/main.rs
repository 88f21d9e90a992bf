//! `booti` binary entry point.
use std::io::Write as _;
use std::sync::Arc;

use anyhow::Result;
use booti_cli::{cli, commands, logging};
use clap::{CommandFactory as _, Parser as _};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    let command = match &args.command {
        cli::Command::Install(_) => "install",
        cli::Command::List => "list",
        cli::Command::Push(_) => "push",
        cli::Command::Completions { shell } => {
            let mut cmd = cli::Cli::command();
            clap_complete::generate(*shell, &mut cmd, "booti", &mut std::io::stdout());
            return Ok(());
        }
        cli::Command::Version => {
            let version = option_env!("BOOTI_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
            writeln!(std::io::stdout(), "booti {version}")?;
            return Ok(());
        }
    };

    logging::init_subscriber(args.verbose, command);
    let log = Arc::new(logging::Logger::new(command));

    match &args.command {
        cli::Command::Install(opts) => commands::install::run(&args.global, opts, &log),
        cli::Command::Push(opts) => commands::push::run(&args.global, opts, &log),
        cli::Command::List => commands::list::run(&args.global, log.as_ref()),
        cli::Command::Completions { .. } | cli::Command::Version => Ok(()),
    }
}
