//! Command: run pending updates of one script or of every script.
use std::sync::Arc;

use anyhow::Result;

use super::CommandSetup;
use crate::cli::{GlobalOpts, RunOpts};
use crate::error::RunError;
use crate::exec::{Executor, SystemExecutor};
use crate::logging::{Log, Logger, ScriptStatus};
use crate::runner::{RunOptions, RunReport, Runner};
use crate::store::{FileVersionStore, VersionStore};

/// Run the `run` command.
///
/// # Errors
///
/// Returns an error if setup fails, the named script fails, or any script of
/// a batch failed or was aborted.
pub fn run(global: &GlobalOpts, opts: &RunOpts, log: &Arc<Logger>) -> Result<()> {
    let executor: Arc<dyn Executor> = Arc::new(SystemExecutor);
    let setup = CommandSetup::init(global, Arc::clone(log) as Arc<dyn Log>, executor)?;

    if opts.list {
        println!("{}", render_listing(&setup, &FileVersionStore));
        return Ok(());
    }

    setup.install_interrupt_handler();
    let result = run_scripts(&setup, &FileVersionStore, opts);
    log.print_summary();
    result
}

/// Run the script named in `opts`, or every script in declaration order.
///
/// Each outcome is recorded on the context's log. In a batch a failed
/// script does not stop the following ones; an abort does, and the rest are
/// recorded as not run.
///
/// # Errors
///
/// Returns the named script's error, or a count of failed and aborted
/// scripts for a batch.
pub fn run_scripts(setup: &CommandSetup, store: &dyn VersionStore, opts: &RunOpts) -> Result<()> {
    let runner = Runner::new(&setup.config.scripts, &setup.factory, store, &setup.ctx);
    let log = &*setup.ctx.log;

    if let Some(name) = &opts.script {
        let options = RunOptions {
            start_from: opts.start,
            max_version: opts.end,
        };
        run_one(&runner, log, name, &options)?;
        return Ok(());
    }

    let names = setup.config.scripts.all_names();
    if names.is_empty() {
        log.info("no scripts configured");
        return Ok(());
    }

    let mut failed = 0usize;
    let mut stopped = false;
    for name in names {
        if stopped || setup.ctx.abort_requested() {
            stopped = true;
            log.record_script(name, ScriptStatus::NotRun, None);
            continue;
        }
        if let Err(e) = run_one(&runner, log, name, &RunOptions::default()) {
            failed += 1;
            stopped = e.is_abort();
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} script(s) failed");
    }
    Ok(())
}

fn run_one(
    runner: &Runner<'_>,
    log: &dyn Log,
    name: &str,
    options: &RunOptions,
) -> Result<RunReport, RunError> {
    match runner.run(name, options) {
        Ok(report) => {
            log.record_script(name, ScriptStatus::Completed, Some(&outcome(&report)));
            Ok(report)
        }
        Err(e) => {
            let status = if e.is_abort() {
                ScriptStatus::Aborted
            } else {
                ScriptStatus::Failed
            };
            if matches!(e, RunError::Config(_) | RunError::RootRequired { .. }) {
                log.error(&e.to_string());
            }
            log.record_script(name, status, Some(&failure_message(&e)));
            Err(e)
        }
    }
}

fn outcome(report: &RunReport) -> String {
    if report.is_noop() {
        format!("up to date at version {}", report.final_version)
    } else {
        format!(
            "version {} -> {}",
            report.start_version, report.final_version
        )
    }
}

fn failure_message(err: &RunError) -> String {
    match err {
        RunError::Failed {
            version, source, ..
        } => format!("update {version}: {source}"),
        RunError::Aborted { reason, .. } => reason.clone(),
        RunError::PreRun { source, .. } => format!("pre-run: {source}"),
        RunError::PostRun { source, .. } => format!("post-run: {source}"),
        RunError::Persist {
            version, source, ..
        } => format!("could not record version {version}: {source}"),
        RunError::RootRequired { .. } => "requires root".to_string(),
        RunError::Config(e) => e.to_string(),
    }
}

/// Table of the configured scripts with their recorded and available
/// versions, in declaration order.
#[must_use]
pub fn render_listing(setup: &CommandSetup, store: &dyn VersionStore) -> String {
    let rows: Vec<[String; 5]> = setup
        .config
        .scripts
        .iter()
        .map(|script| {
            let available = setup
                .factory
                .create(&script.implementation)
                .map_or_else(|| "-".to_string(), |s| s.updates().len().to_string());
            [
                script.name.clone(),
                script.implementation.clone(),
                store
                    .load(script)
                    .map_or_else(|_| "?".to_string(), |r| r.last_applied.to_string()),
                available,
                script.description.clone(),
            ]
        })
        .collect();

    let name_width = rows
        .iter()
        .map(|r| r[0].len())
        .chain([6])
        .max()
        .unwrap_or(6);
    let impl_width = rows
        .iter()
        .map(|r| r[1].len())
        .chain([14])
        .max()
        .unwrap_or(14);

    let line = |cells: [&str; 5]| {
        let [name, implementation, version, available, description] = cells;
        format!(
            "{name:<name_width$}  {implementation:<impl_width$}  {version:>7}  {available:>7}  {description}"
        )
        .trim_end()
        .to_string()
    };

    std::iter::once(line([
        "SCRIPT",
        "IMPLEMENTATION",
        "VERSION",
        "UPDATES",
        "DESCRIPTION",
    ]))
    .chain(rows.iter().map(|row| line(row.each_ref().map(String::as_str))))
    .collect::<Vec<_>>()
    .join("\n")
}
