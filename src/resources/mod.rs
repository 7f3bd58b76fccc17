//! Idempotent resource primitives (check + apply pattern).
//!
//! Update steps describe the desired end state with resources and hand them
//! to [`ensure`] / [`ensure_all`], which only touch what is out of place.
//! Re-running a step whose resources are already correct changes nothing.
pub mod chmod;
pub mod helpers;
pub mod line;
pub mod link;
pub mod package;
pub mod service;

use anyhow::{Result, bail};

use crate::runner::Context;

/// Minimal interface for resources that can be described and applied.
pub trait Applicable {
    /// Human-readable description of this resource.
    fn description(&self) -> String;

    /// Apply the resource change.
    ///
    /// This method should:
    /// - Create parent directories if needed
    /// - Update the resource to match the desired state
    /// - Return the appropriate `ResourceChange` result
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot be applied due to I/O failures,
    /// permission issues, a failing external command, or other system errors.
    fn apply(&self) -> Result<ResourceChange>;
}

/// State of a resource (file, package, service, etc.).
///
/// # Examples
///
/// ```
/// use homeconf_cli::resources::ResourceState;
///
/// let missing = ResourceState::Missing;
/// let correct = ResourceState::Correct;
/// let wrong = ResourceState::Incorrect { current: "points to /other".into() };
/// let skip = ResourceState::Invalid { reason: "source does not exist".into() };
///
/// assert_ne!(missing, correct);
/// assert_eq!(correct, ResourceState::Correct);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Resource does not exist or is not present.
    Missing,
    /// Resource exists and matches the desired state.
    Correct,
    /// Resource exists but does not match the desired state.
    Incorrect {
        /// The current value of the resource.
        current: String,
    },
    /// Resource cannot be applied (e.g., target is a directory that shouldn't be removed).
    Invalid {
        /// Reason why the resource cannot be applied.
        reason: String,
    },
}

/// Result of applying a resource change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// Resource was created or updated.
    Applied,
    /// Resource was already correct (no change needed).
    AlreadyCorrect,
    /// Resource was skipped (e.g., missing source file).
    Skipped {
        /// Reason why the resource was skipped.
        reason: String,
    },
}

/// Unified interface for resources that can be checked and applied.
pub trait Resource: Applicable {
    /// Check the current state of the resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource state cannot be determined due to I/O failures,
    /// permission issues, or other system errors.
    fn current_state(&self) -> Result<ResourceState>;

    /// Determine if the resource needs to be changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the current state cannot be determined.
    fn needs_change(&self) -> Result<bool> {
        Ok(matches!(
            self.current_state()?,
            ResourceState::Missing | ResourceState::Incorrect { .. }
        ))
    }
}

/// Counters for steps that process many resources.
///
/// # Examples
///
/// ```
/// use homeconf_cli::resources::Stats;
///
/// let stats = Stats { changed: 3, already_ok: 10, skipped: 0 };
/// assert_eq!(stats.summary(), "3 changed, 10 already ok");
///
/// let stats = Stats { changed: 1, already_ok: 2, skipped: 3 };
/// assert_eq!(stats.summary(), "1 changed, 2 already ok, 3 skipped");
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Number of resources changed.
    pub changed: u32,
    /// Number of resources already in the desired state.
    pub already_ok: u32,
    /// Number of resources that could not be applied and were left alone.
    pub skipped: u32,
}

impl Stats {
    /// Count one outcome.
    pub const fn record(&mut self, change: &ResourceChange) {
        match change {
            ResourceChange::Applied => self.changed += 1,
            ResourceChange::AlreadyCorrect => self.already_ok += 1,
            ResourceChange::Skipped { .. } => self.skipped += 1,
        }
    }

    /// Format the summary string (e.g. "3 changed, 10 already ok, 1 skipped").
    #[must_use]
    pub fn summary(&self) -> String {
        if self.skipped > 0 {
            format!(
                "{} changed, {} already ok, {} skipped",
                self.changed, self.already_ok, self.skipped
            )
        } else {
            format!("{} changed, {} already ok", self.changed, self.already_ok)
        }
    }
}

/// Bring one resource into its desired state.
///
/// Correct resources are left alone. Invalid ones are skipped with a warning.
///
/// # Errors
///
/// Returns an error if the state cannot be determined or the change fails.
pub fn ensure<R: Resource + ?Sized>(ctx: &Context, resource: &R) -> Result<ResourceChange> {
    let desc = resource.description();
    match resource.current_state()? {
        ResourceState::Correct => {
            ctx.log.debug(&format!("ok: {desc}"));
            Ok(ResourceChange::AlreadyCorrect)
        }
        ResourceState::Invalid { reason } => {
            ctx.log.warn(&format!("skipping {desc}: {reason}"));
            Ok(ResourceChange::Skipped { reason })
        }
        state @ (ResourceState::Missing | ResourceState::Incorrect { .. }) => {
            if let ResourceState::Incorrect { current } = &state {
                ctx.log.debug(&format!("{desc} is out of place ({current})"));
            }
            let change = resource.apply()?;
            match &change {
                ResourceChange::Applied => ctx.log.info(&desc),
                ResourceChange::AlreadyCorrect => {}
                ResourceChange::Skipped { reason } => {
                    bail!("failed to apply {desc}: {reason}");
                }
            }
            Ok(change)
        }
    }
}

/// [`ensure`] every resource in order, stopping between resources if the
/// operator asked to abort.
///
/// # Errors
///
/// Returns the first failure, or the abort signal.
pub fn ensure_all(ctx: &Context, resources: &[&dyn Resource]) -> Result<Stats> {
    let mut stats = Stats::default();
    for resource in resources {
        ctx.check_abort()?;
        stats.record(&ensure(ctx, *resource)?);
    }
    ctx.log.debug(&stats.summary());
    Ok(stats)
}
