use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Top-level CLI entry point for the provisioning engine.
#[derive(Parser, Debug)]
#[command(
    name = "homeconf",
    about = "Versioned home-directory and machine provisioning",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: `$HOMECONF_CONFIG`, `~/.homeconf/homeconf.toml`, `/etc/homeconf/homeconf.toml`)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the home directory being configured
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Override the detected hostname
    #[arg(long, global = true, value_name = "NAME")]
    pub hostname: Option<String>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run pending updates of one script, or of every script in order
    Run(RunOpts),
    /// List registered machines and their types
    Machines,
    /// Print a shell completion script
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
    /// Print version information
    Version,
}

/// Options for the `run` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct RunOpts {
    /// Script to run (default: all scripts, in declaration order)
    pub script: Option<String>,

    /// Start after this version instead of the recorded one
    #[arg(short, long, value_name = "N", requires = "script")]
    pub start: Option<u32>,

    /// Do not run updates numbered above this
    #[arg(short, long, value_name = "N", requires = "script")]
    pub end: Option<u32>,

    /// List the configured scripts and their recorded versions
    #[arg(short, long, conflicts_with_all = ["start", "end"])]
    pub list: bool,
}
