//! Domain-specific error types for the provisioning engine.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Internal modules return typed errors (e.g., [`ConfigError`], [`RunError`])
//! while command handlers at the CLI boundary convert them to [`anyhow::Error`]
//! via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! RunError
//! ├── Config(ConfigError)  — unknown script/machine, duplicates, bad config file
//! ├── RootRequired         — script needs root, caller is not root
//! ├── PreRun / PostRun     — lifecycle hook failures
//! ├── Failed               — hard failure inside an update step
//! ├── Persist(StoreError)  — version file could not be written
//! └── Aborted              — operator-requested abort (AbortConfig)
//! ```
//!
//! [`NotApplicable`] and [`AbortConfig`] are *signals* rather than failures:
//! update steps return them wrapped in an [`anyhow::Error`] and the runner
//! recognises them with `downcast_ref`.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that arise from configuration discovery, loading and registration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No configuration file was found in any of the searched locations.
    #[error("no configuration file found (searched: {searched})")]
    NotFound {
        /// Comma-separated list of the paths that were tried.
        searched: String,
    },

    /// An I/O error occurred while reading a config file.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file contains a syntax or schema error.
    #[error("invalid configuration in {path}: {message}")]
    Parse {
        /// Path of the offending file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A machine declares a type tag outside the fixed enumeration.
    #[error("machine '{hostname}' is of unknown type '{tag}'")]
    UnknownMachineType {
        /// Hostname of the offending machine entry.
        hostname: String,
        /// The unrecognised tag.
        tag: String,
    },

    /// Two entries of the same kind share a key.
    #[error("duplicate {kind} entry '{name}'")]
    DuplicateRegistration {
        /// What kind of entry was duplicated (`"machine"`, `"script"`, ...).
        kind: &'static str,
        /// The duplicated key.
        name: String,
    },

    /// The requested script is not registered.
    #[error("unknown configuration script '{0}'")]
    UnknownScript(String),

    /// The machine is not registered; provisioning refuses to run on it.
    #[error("unknown machine '{0}': refusing to run configuration scripts on it")]
    UnknownMachine(String),

    /// A script names an implementation the factory does not provide.
    #[error("script '{script}' uses unknown implementation '{implementation}'")]
    UnknownImplementation {
        /// Script name.
        script: String,
        /// Requested implementation key.
        implementation: String,
    },

    /// A script entry has an empty store directory.
    #[error("the store directory for configuration script '{0}' is not specified")]
    MissingStoreDir(String),
}

/// Errors raised by the version store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The version file or its directory could not be read or written.
    #[error("version file {path}: {source}")]
    Io {
        /// Path of the version file (or its directory).
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The version file exists but does not hold a usable version.
    #[error("corrupt version file {path}: {message}")]
    Corrupt {
        /// Path of the version file.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },
}

/// Controlled skip signal: the update does not apply to this machine.
///
/// The runner still advances the version past a step that returns this.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("update not applied: {reason}")]
pub struct NotApplicable {
    /// Why the update was skipped.
    pub reason: String,
}

impl NotApplicable {
    /// Create a new skip signal.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Controlled early termination: no further update (or script) should run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("configuration aborted: {reason}")]
pub struct AbortConfig {
    /// Operator-facing reason for the abort.
    pub reason: String,
}

impl AbortConfig {
    /// Create a new abort signal.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors returned by the update runner.
#[derive(Error, Debug)]
pub enum RunError {
    /// Configuration-time error reported before any update runs.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The script requires root privileges.
    #[error("configuration script '{script}' requires root privileges")]
    RootRequired {
        /// Script name.
        script: String,
    },

    /// The `pre_run` hook failed; no update was attempted.
    #[error("configuration script '{script}' failed in pre-run")]
    PreRun {
        /// Script name.
        script: String,
        /// The hook's error.
        #[source]
        source: anyhow::Error,
    },

    /// An update step failed.
    #[error("configuration script '{script}' failed at update {version}")]
    Failed {
        /// Script name.
        script: String,
        /// Number of the failing update.
        version: u32,
        /// The step's error, unchanged.
        #[source]
        source: anyhow::Error,
    },

    /// Progress could not be persisted after a successful step.
    #[error("configuration script '{script}' could not record version {version}")]
    Persist {
        /// Script name.
        script: String,
        /// Version that should have been recorded.
        version: u32,
        /// Store error.
        #[source]
        source: StoreError,
    },

    /// The `post_run` hook failed.
    #[error("configuration script '{script}' failed in post-run")]
    PostRun {
        /// Script name.
        script: String,
        /// The hook's error.
        #[source]
        source: anyhow::Error,
    },

    /// The run was aborted by an [`AbortConfig`] signal.
    #[error("configuration script '{script}' aborted: {reason}")]
    Aborted {
        /// Script name.
        script: String,
        /// Abort reason.
        reason: String,
    },
}

impl RunError {
    /// Whether this error should stop a batch of scripts.
    #[must_use]
    pub const fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}
