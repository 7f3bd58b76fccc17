use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use homeconf_cli::cli::{Cli, Command};
use homeconf_cli::commands;
use homeconf_cli::logging::{self, Logger};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();

    match args.command {
        Command::Run(opts) => {
            logging::init_subscriber(args.global.verbose, "run");
            let log = Arc::new(Logger::new("run"));
            commands::run::run(&args.global, &opts, &log)
        }
        Command::Machines => {
            logging::init_subscriber(args.global.verbose, "machines");
            let log = Arc::new(Logger::new("machines"));
            commands::machines::run(&args.global, &log)
        }
        Command::Completions { shell } => {
            commands::completions::run(shell, &mut std::io::stdout());
            Ok(())
        }
        Command::Version => {
            commands::version::run();
            Ok(())
        }
    }
}
