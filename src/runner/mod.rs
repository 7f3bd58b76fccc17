//! Versioned update runner.
//!
//! An [`UpdateScript`] supplies an ordered list of numbered update steps
//! ([`Updates`]). The [`Runner`] loads the script's [`VersionRecord`], runs
//! every step after the recorded one in ascending order, and persists the new
//! version after each step that succeeded or was skipped as not applicable.
//!
//! ```text
//! NotStarted ─▶ Initializing ─▶ Running(n) ─┬─▶ Completed
//!                    │                       ├─▶ Failed
//!                    └───────────────────────┴─▶ Aborted
//! ```
//!
//! [`VersionRecord`]: crate::store::VersionRecord
pub mod context;
pub mod engine;
pub mod factory;
pub mod gate;

use std::fmt;

use anyhow::Result;

use crate::config::scripts::ScriptDescriptor;
use crate::store::VersionRecord;

pub use context::Context;
pub use engine::{RunOptions, RunReport, Runner};
pub use factory::ScriptFactory;
pub use gate::{Gate, only_if_any_type, only_if_hostname, unless_any_type};

/// One update step.
pub type Step = Box<dyn Fn(&Context) -> Result<()> + Send + Sync>;

/// The ordered, dense list of update steps of a script, numbered from 1.
///
/// # Examples
///
/// ```
/// use homeconf_cli::runner::Updates;
///
/// let updates = Updates::new()
///     .step(|_ctx| Ok(()))
///     .step(|ctx| {
///         ctx.log.info("second update");
///         Ok(())
///     });
/// assert_eq!(updates.len(), 2);
/// assert!(updates.get(0).is_none());
/// assert!(updates.get(2).is_some());
/// assert!(updates.get(3).is_none());
/// ```
#[derive(Default)]
pub struct Updates {
    steps: Vec<Step>,
}

impl Updates {
    /// An empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next numbered step.
    #[must_use]
    pub fn step<F>(mut self, f: F) -> Self
    where
        F: Fn(&Context) -> Result<()> + Send + Sync + 'static,
    {
        self.push(f);
        self
    }

    /// Append the next numbered step in place.
    pub fn push<F>(&mut self, f: F)
    where
        F: Fn(&Context) -> Result<()> + Send + Sync + 'static,
    {
        self.steps.push(Box::new(f));
    }

    /// Step number `version` (1-based).
    #[must_use]
    pub fn get(&self, version: u32) -> Option<&Step> {
        let index = usize::try_from(version).ok()?.checked_sub(1)?;
        self.steps.get(index)
    }

    /// Number of steps; also the highest step number.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the script has no steps.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Debug for Updates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Updates")
            .field("steps", &self.steps.len())
            .finish()
    }
}

/// What a script receives when it is bound to a run.
#[derive(Debug, Clone, Copy)]
pub struct ScriptEnv<'a> {
    /// The script's registry metadata.
    pub descriptor: &'a ScriptDescriptor,
    /// Progress loaded from the version store.
    pub record: &'a VersionRecord,
    /// The runner context.
    pub ctx: &'a Context,
}

/// A named, ordered collection of idempotent update steps.
///
/// Lifecycle for one run: [`init`](Self::init), [`pre_run`](Self::pre_run),
/// [`updates`](Self::updates) (steps run in ascending order), then
/// [`post_run`](Self::post_run) on success or [`post_fail`](Self::post_fail)
/// on a hard failure. An abort skips both.
pub trait UpdateScript {
    /// Bind the instance to its descriptor, version record and context.
    fn init(&mut self, _env: &ScriptEnv<'_>) {}

    /// One-time setup before any update runs.
    ///
    /// # Errors
    ///
    /// An error stops the run before any update.
    fn pre_run(&mut self, _ctx: &Context) -> Result<()> {
        Ok(())
    }

    /// The script's update steps; called once, after [`pre_run`](Self::pre_run).
    fn updates(&self) -> Updates;

    /// Called after the last pending update ran.
    ///
    /// # Errors
    ///
    /// An error is a hard failure of the run.
    fn post_run(&mut self, _ctx: &Context) -> Result<()> {
        Ok(())
    }

    /// Best-effort cleanup after a hard failure; errors are logged and ignored.
    ///
    /// # Errors
    ///
    /// Any error is logged by the runner and otherwise ignored.
    fn post_fail(&mut self, _ctx: &Context, _error: &anyhow::Error) -> Result<()> {
        Ok(())
    }
}

/// States of one script run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Nothing happened yet.
    NotStarted,
    /// Loading the version record and running `pre_run`.
    Initializing,
    /// Running the given update.
    Running(u32),
    /// All pending updates ran and `post_run` succeeded.
    Completed,
    /// A hook or update failed.
    Failed,
    /// An abort signal stopped the run.
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => f.write_str("not started"),
            Self::Initializing => f.write_str("initializing"),
            Self::Running(n) => write!(f, "running update {n}"),
            Self::Completed => f.write_str("completed"),
            Self::Failed => f.write_str("failed"),
            Self::Aborted => f.write_str("aborted"),
        }
    }
}
