//! Structured logger with per-script sink and summary collection.
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::script_log::{ScriptEvent, ScriptSink};
use super::types::{Log, ScriptEntry, ScriptStatus};
use super::utils::log_file_path;

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
///
/// The `record_script` method is **not** included because its signature differs
/// from the `fn(&self, &str)` pattern shared by the display methods.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger backed by [`tracing`].
///
/// All messages are written to the persistent log file at
/// `$XDG_CACHE_HOME/homeconf/<command>.log` by the subscriber's file layer,
/// and to the per-script log while one is open.
#[derive(Debug)]
pub struct Logger {
    scripts: Mutex<Vec<ScriptEntry>>,
    log_file: Option<PathBuf>,
    sink: ScriptSink,
}

impl Logger {
    /// Create a new logger.
    ///
    /// Stores the log file path for display in the run summary.  The log file
    /// itself is created and initialised by [`init_subscriber`](super::subscriber::init_subscriber);
    /// this constructor does not write to the file.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self::with_log_file(log_file_path(command))
    }

    /// Create a logger reporting `log_file` as the command log.
    #[must_use]
    pub fn with_log_file(log_file: Option<PathBuf>) -> Self {
        Self {
            scripts: Mutex::new(Vec::new()),
            log_file,
            sink: ScriptSink::default(),
        }
    }

    /// Return the log file path, if available.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Return a clone of all recorded script entries.
    #[must_use]
    pub fn script_entries(&self) -> Vec<ScriptEntry> {
        self.scripts.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        self.sink.emit(ScriptEvent::Error, msg);
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        self.sink.emit(ScriptEvent::Warn, msg);
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        self.sink.emit(ScriptEvent::Stage, msg);
        tracing::info!(target: "homeconf::stage", "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        self.sink.emit(ScriptEvent::Info, msg);
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file).
    pub fn debug(&self, msg: &str) {
        self.sink.emit(ScriptEvent::Debug, msg);
        tracing::debug!("{msg}");
    }

    /// Record a script result for the summary.
    pub fn record_script(&self, name: &str, status: ScriptStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.scripts.lock() {
            guard.push(ScriptEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Count the scripts that failed or were aborted.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.scripts.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|t| matches!(t.status, ScriptStatus::Failed | ScriptStatus::Aborted))
                .count()
        })
    }

    /// Print the summary of all recorded scripts.
    pub fn print_summary(&self) {
        let scripts = self.script_entries();
        if scripts.is_empty() {
            return;
        }

        println!();
        self.stage("Summary");

        let mut completed = 0u32;
        let mut failed = 0u32;
        let mut aborted = 0u32;
        let mut not_run = 0u32;

        for script in &scripts {
            let (icon, color) = match script.status {
                ScriptStatus::Completed => {
                    completed += 1;
                    ("✓", "\x1b[32m")
                }
                ScriptStatus::Failed => {
                    failed += 1;
                    ("✗", "\x1b[31m")
                }
                ScriptStatus::Aborted => {
                    aborted += 1;
                    ("!", "\x1b[33m")
                }
                ScriptStatus::NotRun => {
                    not_run += 1;
                    ("·", "\x1b[2m")
                }
            };

            let suffix = script
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", script.name));
        }

        println!();
        let total = completed + failed + aborted + not_run;
        self.info(&format!(
            "{total} scripts: \x1b[32m{completed} completed\x1b[0m, \x1b[31m{failed} failed\x1b[0m, \x1b[33m{aborted} aborted\x1b[0m, \x1b[2m{not_run} not run\x1b[0m"
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error);

    fn record_script(&self, name: &str, status: ScriptStatus, message: Option<&str>) {
        self.record_script(name, status, message);
    }

    fn open_script_log(&self, path: &Path) -> io::Result<()> {
        self.sink.open(path)
    }

    fn close_script_log(&self) {
        self.sink.close();
    }
}
