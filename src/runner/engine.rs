use std::fmt::Write as _;

use super::{Context, RunState, ScriptEnv, ScriptFactory, UpdateScript};
use crate::config::scripts::{ScriptDescriptor, ScriptRegistry};
use crate::error::{AbortConfig, ConfigError, NotApplicable, RunError};
use crate::logging::ScriptLogScope;
use crate::store::{VersionRecord, VersionStore};

/// Overrides for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Start after this version instead of the recorded one.
    pub start_from: Option<u32>,
    /// Do not run updates numbered above this.
    pub max_version: Option<u32>,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Script name.
    pub script: String,
    /// Version the run started after.
    pub start_version: u32,
    /// Version recorded at the end of the run.
    pub final_version: u32,
    /// Updates whose body ran and succeeded.
    pub applied: Vec<u32>,
    /// Updates that signalled they do not apply to this machine.
    pub skipped: Vec<u32>,
}

impl RunReport {
    /// Whether no update ran or was skipped.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.applied.is_empty() && self.skipped.is_empty()
    }
}

/// Drives update scripts against the version store.
pub struct Runner<'a> {
    scripts: &'a ScriptRegistry,
    factory: &'a ScriptFactory,
    store: &'a dyn VersionStore,
    ctx: &'a Context,
}

impl std::fmt::Debug for Runner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("scripts", &self.scripts.all_names())
            .field("factory", self.factory)
            .field("store", &"<dyn VersionStore>")
            .field("hostname", &self.ctx.hostname)
            .finish()
    }
}

/// Mutable bookkeeping of one run.
struct Execution<'r> {
    name: &'r str,
    state: RunState,
    ctx: &'r Context,
}

impl Execution<'_> {
    fn enter(&mut self, next: RunState) {
        self.ctx
            .log
            .debug(&format!("{}: {} -> {next}", self.name, self.state));
        self.state = next;
    }
}

impl<'a> Runner<'a> {
    /// Create a runner.
    #[must_use]
    pub const fn new(
        scripts: &'a ScriptRegistry,
        factory: &'a ScriptFactory,
        store: &'a dyn VersionStore,
        ctx: &'a Context,
    ) -> Self {
        Self {
            scripts,
            factory,
            store,
            ctx,
        }
    }

    /// Run the pending updates of script `name`.
    ///
    /// Updates run in ascending order from the recorded version (or
    /// `start_from`) until the first missing number or `max_version`. The
    /// version is persisted after every update that succeeded or signalled
    /// [`NotApplicable`].
    ///
    /// # Errors
    ///
    /// - [`RunError::Config`] for an unknown script, machine or implementation
    /// - [`RunError::RootRequired`] if the script needs root and we are not
    /// - [`RunError::PreRun`] / [`RunError::PostRun`] when a hook fails
    /// - [`RunError::Failed`] when an update fails; the version stays at the
    ///   last update that completed
    /// - [`RunError::Persist`] when the version cannot be recorded
    /// - [`RunError::Aborted`] on an [`AbortConfig`] signal or operator interrupt
    pub fn run(&self, name: &str, opts: &RunOptions) -> Result<RunReport, RunError> {
        let descriptor = self
            .scripts
            .describe(name)
            .ok_or_else(|| ConfigError::UnknownScript(name.to_string()))?;
        let types = self.ctx.machine_types()?;
        if descriptor.root_required && !self.ctx.is_root {
            return Err(RunError::RootRequired {
                script: name.to_string(),
            });
        }
        let mut script = self.factory.create(&descriptor.implementation).ok_or_else(|| {
            ConfigError::UnknownImplementation {
                script: name.to_string(),
                implementation: descriptor.implementation.clone(),
            }
        })?;

        let log = &*self.ctx.log;
        let _script_log = ScriptLogScope::open(log, &descriptor.log_path());
        let mut exec = Execution {
            name,
            state: RunState::NotStarted,
            ctx: self.ctx,
        };
        let type_list: Vec<String> = types.iter().map(ToString::to_string).collect();
        self.announce(descriptor, &type_list);

        exec.enter(RunState::Initializing);
        let record = self.load_record(descriptor);
        script.init(&ScriptEnv {
            descriptor,
            record: &record,
            ctx: self.ctx,
        });
        if let Err(e) = script.pre_run(self.ctx) {
            return Err(self.fail_hook(&mut exec, script.as_mut(), e, |script, source| {
                RunError::PreRun { script, source }
            }));
        }

        let start_version = opts.start_from.unwrap_or(record.last_applied);
        if opts.start_from.is_some() {
            log.info(&format!(
                "starting after version {start_version} (recorded: {})",
                record.last_applied
            ));
        }
        let report = self.apply_updates(
            &mut exec,
            descriptor,
            script.as_mut(),
            start_version,
            opts.max_version,
        )?;

        if let Err(e) = script.post_run(self.ctx) {
            return Err(self.fail_hook(&mut exec, script.as_mut(), e, |script, source| {
                RunError::PostRun { script, source }
            }));
        }
        exec.enter(RunState::Completed);
        log.info(&summarize(descriptor, &report));
        Ok(report)
    }

    fn announce(&self, descriptor: &ScriptDescriptor, types: &[String]) {
        let log = &*self.ctx.log;
        if descriptor.description.is_empty() {
            log.stage(&format!("Running {}", descriptor.name));
        } else {
            log.stage(&format!(
                "Running {}: {}",
                descriptor.name, descriptor.description
            ));
        }
        log.info(&format!(
            "machine {} is of type(s): {}",
            self.ctx.hostname,
            types.join(", ")
        ));
    }

    /// Recorded version of `descriptor`; an unusable record counts as never run.
    fn load_record(&self, descriptor: &ScriptDescriptor) -> VersionRecord {
        self.store.load(descriptor).unwrap_or_else(|e| {
            self.ctx
                .log
                .warn(&format!("{e}; treating {} as never run", descriptor.name));
            VersionRecord::new(&descriptor.name)
        })
    }

    /// Run every step after `start_version`, persisting after each one.
    fn apply_updates(
        &self,
        exec: &mut Execution<'_>,
        descriptor: &ScriptDescriptor,
        script: &mut dyn UpdateScript,
        start_version: u32,
        max_version: Option<u32>,
    ) -> Result<RunReport, RunError> {
        let name = exec.name;
        let log = &*self.ctx.log;
        let updates = script.updates();
        let mut current = start_version;
        let mut applied = Vec::new();
        let mut skipped = Vec::new();
        while let Some(next) = current.checked_add(1) {
            if let Some(max) = max_version
                && next > max
            {
                log.debug(&format!("{name}: stopping at maximum version {max}"));
                break;
            }
            let Some(step) = updates.get(next) else {
                break;
            };
            if self.ctx.abort_requested() {
                exec.enter(RunState::Aborted);
                return Err(self.aborted(name, "interrupted by operator"));
            }

            exec.enter(RunState::Running(next));
            match step(self.ctx) {
                Ok(()) => applied.push(next),
                Err(e) => {
                    if let Some(skip) = e.downcast_ref::<NotApplicable>() {
                        log.info(&format!("update {next} not applied: {}", skip.reason));
                        skipped.push(next);
                    } else if let Some(abort) = e.downcast_ref::<AbortConfig>() {
                        exec.enter(RunState::Aborted);
                        return Err(self.aborted(name, &abort.reason));
                    } else {
                        log.error(&format!("{name}: update {next} failed: {e:#}"));
                        exec.enter(RunState::Failed);
                        self.post_fail(name, script, &e);
                        return Err(RunError::Failed {
                            script: name.to_string(),
                            version: next,
                            source: e,
                        });
                    }
                }
            }

            current = next;
            if let Err(source) = self
                .store
                .save(descriptor, &VersionRecord::at(name, current))
            {
                log.error(&format!("{name}: {source}"));
                exec.enter(RunState::Failed);
                let hook_err = anyhow::anyhow!("could not record version {current}: {source}");
                self.post_fail(name, script, &hook_err);
                return Err(RunError::Persist {
                    script: name.to_string(),
                    version: current,
                    source,
                });
            }
            log.info(&format!("updated to version {current}"));
        }

        Ok(RunReport {
            script: name.to_string(),
            start_version,
            final_version: current,
            applied,
            skipped,
        })
    }

    /// Map a failed lifecycle hook to the run error, honouring abort signals.
    fn fail_hook(
        &self,
        exec: &mut Execution<'_>,
        script: &mut dyn UpdateScript,
        e: anyhow::Error,
        wrap: impl FnOnce(String, anyhow::Error) -> RunError,
    ) -> RunError {
        if let Some(abort) = e.downcast_ref::<AbortConfig>() {
            exec.enter(RunState::Aborted);
            return self.aborted(exec.name, &abort.reason);
        }
        self.ctx
            .log
            .error(&format!("{}: {} failed: {e:#}", exec.name, exec.state));
        exec.enter(RunState::Failed);
        self.post_fail(exec.name, script, &e);
        wrap(exec.name.to_string(), e)
    }

    /// Best-effort failure hook: errors are logged and swallowed.
    fn post_fail(&self, name: &str, script: &mut dyn UpdateScript, error: &anyhow::Error) {
        if let Err(e) = script.post_fail(self.ctx, error) {
            self.ctx
                .log
                .warn(&format!("{name}: post-fail hook failed: {e:#}"));
        }
    }

    fn aborted(&self, name: &str, reason: &str) -> RunError {
        self.ctx.log.warn(&format!("{name}: aborted: {reason}"));
        RunError::Aborted {
            script: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn summarize(descriptor: &ScriptDescriptor, report: &RunReport) -> String {
    let mut out = format!("{} is at version {}", descriptor.name, report.final_version);
    if report.is_noop() {
        out.push_str(" (already up to date)");
    } else {
        let _ = write!(
            out,
            " ({} applied, {} not applicable)",
            report.applied.len(),
            report.skipped.len()
        );
    }
    out
}
