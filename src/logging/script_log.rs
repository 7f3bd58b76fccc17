//! Per-script log sink, open only while a script runs.
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::types::Log;
use super::utils::{format_utc_datetime, strip_ansi, version_string};

/// Event kinds written to the per-script log.
#[derive(Debug, Clone, Copy)]
pub enum ScriptEvent {
    /// Stage header.
    Stage,
    /// Informational message.
    Info,
    /// Debug-level message.
    Debug,
    /// Warning message.
    Warn,
    /// Error message.
    Error,
}

impl ScriptEvent {
    /// Short tag for the log line.
    const fn tag(self) -> &'static str {
        match self {
            Self::Stage => "STAGE",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

/// An open per-script log file.
///
/// Lines are appended as `<utc datetime> <TAG> <message>` so that the file
/// accumulates the history of every run of the script.
#[derive(Debug)]
pub struct ScriptLog {
    file: Mutex<fs::File>,
    path: PathBuf,
}

impl ScriptLog {
    /// Open `path` for appending, creating it (and its directory) if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(
            file,
            "# homeconf {} run started {}",
            version_string(),
            format_utc_datetime()
        )?;
        Ok(Self {
            file: Mutex::new(file),
            path: path.to_path_buf(),
        })
    }

    /// Append one event.
    pub fn emit(&self, event: ScriptEvent, message: &str) {
        let line = format!(
            "{} {:<5} {}\n",
            format_utc_datetime(),
            event.tag(),
            strip_ansi(message)
        );
        if let Ok(mut f) = self.file.lock() {
            f.write_all(line.as_bytes()).ok();
        }
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Holder for the currently open [`ScriptLog`], shared by log backends.
#[derive(Debug, Default)]
pub(super) struct ScriptSink {
    current: Mutex<Option<ScriptLog>>,
}

impl ScriptSink {
    pub(super) fn open(&self, path: &Path) -> io::Result<()> {
        let log = ScriptLog::open(path)?;
        if let Ok(mut guard) = self.current.lock() {
            *guard = Some(log);
        }
        Ok(())
    }

    pub(super) fn close(&self) {
        if let Ok(mut guard) = self.current.lock() {
            *guard = None;
        }
    }

    pub(super) fn emit(&self, event: ScriptEvent, message: &str) {
        if let Ok(guard) = self.current.lock()
            && let Some(log) = guard.as_ref()
        {
            log.emit(event, message);
        }
    }

    pub(super) fn is_open(&self) -> bool {
        self.current.lock().is_ok_and(|g| g.is_some())
    }
}

/// Scoped per-script log: closes the sink when dropped, on every exit path.
#[must_use = "the script log is closed as soon as the scope is dropped"]
pub struct ScriptLogScope<'a> {
    log: &'a dyn Log,
}

impl<'a> ScriptLogScope<'a> {
    /// Open the per-script log at `path` on `log`.
    ///
    /// Failing to open the file is reported as a warning and the run
    /// continues with console and command logging only.
    pub fn open(log: &'a dyn Log, path: &Path) -> Self {
        if let Err(e) = log.open_script_log(path) {
            log.warn(&format!(
                "cannot open script log {}: {e}",
                path.display()
            ));
        }
        Self { log }
    }
}

impl std::fmt::Debug for ScriptLogScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptLogScope").finish_non_exhaustive()
    }
}

impl Drop for ScriptLogScope<'_> {
    fn drop(&mut self) {
        self.log.close_script_log();
    }
}
