// Shared helpers for integration tests.
//
// Provides a temporary home directory holding a configuration file, a fake
// executor and a scripted update-script factory, so each integration test can
// drive the runner in isolation against the real version files.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};

use homeconf_cli::cli::GlobalOpts;
use homeconf_cli::commands::CommandSetup;
use homeconf_cli::config::machines::MachineType;
use homeconf_cli::error::{AbortConfig, NotApplicable};
use homeconf_cli::exec::{ExecResult, Executor};
use homeconf_cli::logging::{BufferedLog, Log};
use homeconf_cli::runner::{Context, ScriptFactory, UpdateScript, Updates, only_if_any_type};
use homeconf_cli::store::{VERSION_FILE_NAME, read_version, write_version};

/// Machines every test configuration starts with.
pub const MACHINES: &str = r#"
[[machines]]
hostname = "laptop1"
types = ["laptop"]

[[machines]]
hostname = "maco"
description = "Main server"
types = ["server", "home_desktop"]

[[machines]]
hostname = "terra"
types = ["home_desktop"]
"#;

/// Behaviour of one scripted update step.
#[derive(Debug, Clone)]
pub enum Step {
    /// Record the call and succeed.
    Ok,
    /// Record the call and fail with a hard error.
    Fail,
    /// Record the call and raise the abort signal.
    Abort,
    /// Raise the not-applicable signal without recording a call.
    Skip,
    /// Record the call, but only on machines of one of these types.
    OnlyIfAnyType(Vec<MachineType>),
}

/// Ordered record of hook and step invocations, shared by every script
/// instance a factory creates.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: String) {
        self.0.lock().expect("journal lock").push(entry);
    }

    /// Every entry so far.
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().expect("journal lock").clone()
    }

    /// The update entries only (`"<script>: update <n>"`).
    pub fn updates(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.contains(": update "))
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.0.lock().expect("journal lock").clear();
    }
}

/// An update script whose steps follow a fixed [`Step`] plan.
struct ScriptedScript {
    key: String,
    plan: Vec<Step>,
    journal: Journal,
}

impl UpdateScript for ScriptedScript {
    fn pre_run(&mut self, _ctx: &Context) -> Result<()> {
        self.journal.push(format!("{}: pre_run", self.key));
        Ok(())
    }

    fn updates(&self) -> Updates {
        let mut updates = Updates::new();
        for (i, step) in self.plan.iter().enumerate() {
            let entry = format!("{}: update {}", self.key, i + 1);
            let journal = self.journal.clone();
            match step.clone() {
                Step::Ok => updates.push(move |_: &Context| {
                    journal.push(entry.clone());
                    Ok(())
                }),
                Step::Fail => updates.push(move |_: &Context| {
                    journal.push(entry.clone());
                    bail!("{entry} broke")
                }),
                Step::Abort => updates.push(move |_: &Context| {
                    journal.push(entry.clone());
                    Err(AbortConfig::new("operator declined").into())
                }),
                Step::Skip => updates.push(|_: &Context| Err(NotApplicable::new("not here").into())),
                Step::OnlyIfAnyType(types) => updates.push(only_if_any_type(
                    &types,
                    move |_: &Context| {
                        journal.push(entry.clone());
                        Ok(())
                    },
                )),
            }
        }
        updates
    }

    fn post_run(&mut self, _ctx: &Context) -> Result<()> {
        self.journal.push(format!("{}: post_run", self.key));
        Ok(())
    }

    fn post_fail(&mut self, _ctx: &Context, _error: &anyhow::Error) -> Result<()> {
        self.journal.push(format!("{}: post_fail", self.key));
        Ok(())
    }
}

/// Factory whose implementations follow the given plans, plus the journal
/// they all write to.
pub fn scripted_factory(plans: &[(&str, Vec<Step>)]) -> (ScriptFactory, Journal) {
    let journal = Journal::default();
    let mut factory = ScriptFactory::new();
    for (key, plan) in plans {
        let name = (*key).to_string();
        let plan = plan.clone();
        let journal = journal.clone();
        factory
            .register(key, move || {
                Box::new(ScriptedScript {
                    key: name.clone(),
                    plan: plan.clone(),
                    journal: journal.clone(),
                })
            })
            .expect("register scripted implementation");
    }
    (factory, journal)
}

/// Executor that answers `id -u` and succeeds at everything else.
#[derive(Debug, Default)]
pub struct FakeExecutor {
    /// Whether `id -u` reports root.
    pub root: bool,
}

impl FakeExecutor {
    fn answer(&self, program: &str) -> ExecResult {
        let stdout = match (program, self.root) {
            ("id", true) => "0\n",
            ("id", false) => "1000\n",
            _ => "",
        };
        ExecResult {
            stdout: stdout.to_string(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        }
    }
}

impl Executor for FakeExecutor {
    fn run(&self, program: &str, _args: &[&str]) -> Result<ExecResult> {
        Ok(self.answer(program))
    }

    fn run_in(&self, _dir: &Path, program: &str, _args: &[&str]) -> Result<ExecResult> {
        Ok(self.answer(program))
    }

    fn run_unchecked(&self, program: &str, _args: &[&str]) -> Result<ExecResult> {
        Ok(self.answer(program))
    }

    fn which(&self, _program: &str) -> bool {
        true
    }
}

/// `[[scripts]]` entry stored under `~/.homeconf/<name>`.
pub fn script_entry(name: &str, implementation: &str, root_required: bool) -> String {
    format!(
        "\n[[scripts]]\nname = \"{name}\"\nimplementation = \"{implementation}\"\nstore = \"~/.homeconf/{name}\"\nroot_required = {root_required}\n"
    )
}

/// An isolated home directory backed by a [`tempfile::TempDir`], holding
/// `homeconf.toml`.
pub struct IntegrationTestContext {
    /// Temporary home directory.
    pub home: tempfile::TempDir,
    /// Path of the configuration file.
    pub config: PathBuf,
}

impl IntegrationTestContext {
    /// Create a home whose configuration is [`MACHINES`] followed by
    /// `scripts`.
    pub fn new(scripts: &str) -> Self {
        let home = tempfile::tempdir().expect("create temp dir");
        let config = home.path().join("homeconf.toml");
        std::fs::write(&config, format!("{MACHINES}{scripts}")).expect("write config");
        Self { home, config }
    }

    /// Path to the home directory.
    pub fn home_path(&self) -> &Path {
        self.home.path()
    }

    /// Global options pointing at this home as `hostname`.
    pub fn global(&self, hostname: &str) -> GlobalOpts {
        GlobalOpts {
            config: Some(self.config.clone()),
            home: Some(self.home.path().to_path_buf()),
            hostname: Some(hostname.to_string()),
            ..GlobalOpts::default()
        }
    }

    /// Run the command setup as `hostname` with an in-memory log.
    pub fn setup(
        &self,
        hostname: &str,
        factory: ScriptFactory,
        root: bool,
    ) -> (CommandSetup, Arc<BufferedLog>) {
        let log = Arc::new(BufferedLog::new());
        let setup = CommandSetup::init_with_factory(
            &self.global(hostname),
            Arc::clone(&log) as Arc<dyn Log>,
            Arc::new(FakeExecutor { root }),
            factory,
        )
        .expect("command setup");
        (setup, log)
    }

    /// Store directory of `script`.
    pub fn store_dir(&self, script: &str) -> PathBuf {
        self.home.path().join(".homeconf").join(script)
    }

    /// Version recorded on disk for `script`, if any.
    pub fn recorded_version(&self, script: &str) -> Option<u32> {
        read_version(&self.store_dir(script).join(VERSION_FILE_NAME)).expect("read version file")
    }

    /// Write a version file for `script` by hand.
    pub fn record_version(&self, script: &str, version: u32) {
        write_version(
            &self.store_dir(script).join(VERSION_FILE_NAME),
            version,
        )
        .expect("write version file");
    }
}
