//! Command: list the registered machines.
use std::sync::Arc;

use anyhow::Result;

use super::CommandSetup;
use crate::cli::GlobalOpts;
use crate::config::machines::MachineRegistry;
use crate::exec::{Executor, SystemExecutor};
use crate::logging::{Log, Logger};

/// Run the `machines` command.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded.
pub fn run(global: &GlobalOpts, log: &Arc<Logger>) -> Result<()> {
    let executor: Arc<dyn Executor> = Arc::new(SystemExecutor);
    let setup = CommandSetup::init(global, Arc::clone(log) as Arc<dyn Log>, executor)?;
    println!(
        "{}",
        render_machines(&setup.config.machines, &setup.platform.hostname)
    );
    Ok(())
}

/// Table of every machine and its types; the current host is marked `*`.
#[must_use]
pub fn render_machines(machines: &MachineRegistry, current: &str) -> String {
    let rows: Vec<(bool, &str, String, &str)> = machines
        .iter()
        .map(|m| {
            let types = if m.types.is_empty() {
                "-".to_string()
            } else {
                m.types
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            (
                m.hostname == current,
                m.hostname.as_str(),
                types,
                m.description.as_str(),
            )
        })
        .collect();

    let host_width = rows.iter().map(|r| r.1.len()).chain([8]).max().unwrap_or(8);
    let type_width = rows.iter().map(|r| r.2.len()).chain([5]).max().unwrap_or(5);
    let line = |marker: bool, host: &str, types: &str, description: &str| {
        let marker = if marker { "* " } else { "  " };
        format!("{marker}{host:<host_width$}  {types:<type_width$}  {description}")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![line(false, "HOSTNAME", "TYPES", "DESCRIPTION")];
    lines.extend(rows.iter().map(|(m, h, t, d)| line(*m, h, t, d)));
    if !machines.is_known(current) {
        lines.push(String::new());
        lines.push(format!("current host {current} is not registered"));
    }
    lines.join("\n")
}
