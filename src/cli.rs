//! Command-line interface definitions.
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Top-level CLI entry point for the bootstrap runner.
#[derive(Parser, Debug)]
#[command(
    name = "booti",
    about = "Declarative machine bootstrap runner with reversible config templates",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Override the steps directory
    #[arg(long, global = true, value_name = "PATH")]
    pub steps_dir: Option<PathBuf>,

    /// Settings file (default: ~/.config/booti/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run steps: scripts and template sync
    Install(InstallOpts),
    /// List discovered steps
    List,
    /// Write local edits back into templates and commit them on a branch
    Push(PushOpts),
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
    /// Print version information
    Version,
}

/// Options for the `install` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct InstallOpts {
    /// Run only these steps (plus their dependencies)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Set a variable, skipping its prompt (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// Never prompt; use existing values and defaults
    #[arg(short = 'y', long)]
    pub non_interactive: bool,
}

/// Options for the `push` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct PushOpts {
    /// Branch to create (default: booti/push-<timestamp>)
    #[arg(long)]
    pub branch: Option<String>,

    /// Rewrite templates but leave committing to the user
    #[arg(long)]
    pub no_commit: bool,
}

/// Parse `NAME=VALUE`. The value may be empty or contain `=`.
fn parse_var(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in '{raw}'"));
    }
    Ok((name.to_string(), value.to_string()))
}
