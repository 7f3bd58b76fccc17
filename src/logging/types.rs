//! Core logging types: script entries, status, and the [`Log`] trait.
use std::io;
use std::path::Path;

/// Outcome of one script in a run, for summary reporting.
#[derive(Debug, Clone)]
pub struct ScriptEntry {
    /// Script name.
    pub name: String,
    /// Final status of the script.
    pub status: ScriptStatus,
    /// Optional detail message (versions applied, failure cause, ...).
    pub message: Option<String>,
}

/// Final status of a script run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStatus {
    /// Every pending update was applied (or skipped) and `post_run` succeeded.
    Completed,
    /// A hook or update failed.
    Failed,
    /// The run was stopped by an abort signal.
    Aborted,
    /// The script was never started (batch stopped earlier).
    NotRun,
}

/// Abstraction over logging backends.
///
/// Both [`Logger`](super::logger::Logger) (tracing output) and
/// [`BufferedLog`](super::buffered::BufferedLog) (in-memory capture)
/// implement this trait, so runner and script code log without knowing
/// where output ends up.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Record a script result for the summary.
    fn record_script(&self, name: &str, status: ScriptStatus, message: Option<&str>);
    /// Start copying every message to the per-script log at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    fn open_script_log(&self, path: &Path) -> io::Result<()>;
    /// Stop copying messages to the per-script log, if one is open.
    fn close_script_log(&self);
}
