//! Command: print a shell completion script.
use std::io::Write;

use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::Cli;

/// Write the completion script for `shell` to `out`.
pub fn run<W: Write>(shell: Shell, out: &mut W) {
    clap_complete::generate(shell, &mut Cli::command(), "homeconf", out);
}
