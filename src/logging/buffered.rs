//! In-memory log capture.
use std::io;
use std::path::Path;
use std::sync::Mutex;

use super::script_log::{ScriptEvent, ScriptSink};
use super::types::{Log, ScriptEntry, ScriptStatus};

/// A single captured log entry.
#[derive(Debug, Clone)]
enum LogEntry {
    /// A stage header entry.
    Stage(String),
    /// An informational entry.
    Info(String),
    /// A debug entry.
    Debug(String),
    /// A warning entry.
    Warn(String),
    /// An error entry.
    Error(String),
}

impl LogEntry {
    /// Render as `"<LEVEL> <message>"`.
    fn render(&self) -> String {
        match self {
            Self::Stage(msg) => format!("STAGE {msg}"),
            Self::Info(msg) => format!("INFO {msg}"),
            Self::Debug(msg) => format!("DEBUG {msg}"),
            Self::Warn(msg) => format!("WARN {msg}"),
            Self::Error(msg) => format!("ERROR {msg}"),
        }
    }
}

/// Implement the display methods of [`Log`] by capturing each message into
/// `self.entries` as the corresponding [`LogEntry`] variant, and copying it
/// to the per-script sink when one is open.
macro_rules! buffer_log_methods {
    ($($method:ident => $variant:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.sink.emit(ScriptEvent::$variant, msg);
                if let Ok(mut guard) = self.entries.lock() {
                    guard.push(LogEntry::$variant(msg.to_string()));
                }
            }
        )+
    };
}

/// Log backend that keeps every message in memory.
///
/// Used when output must be inspected after the fact (tests, embedding
/// callers). Per-script log files are written exactly as with
/// [`Logger`](super::Logger).
#[derive(Debug, Default)]
pub struct BufferedLog {
    entries: Mutex<Vec<LogEntry>>,
    scripts: Mutex<Vec<ScriptEntry>>,
    sink: ScriptSink,
}

impl BufferedLog {
    /// Create an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every captured message, rendered as `"<LEVEL> <message>"`.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.entries
            .lock()
            .map_or_else(|_| vec![], |g| g.iter().map(LogEntry::render).collect())
    }

    /// Every recorded script result.
    #[must_use]
    pub fn script_entries(&self) -> Vec<ScriptEntry> {
        self.scripts.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Whether a per-script log is currently open.
    #[must_use]
    pub fn script_log_open(&self) -> bool {
        self.sink.is_open()
    }
}

impl Log for BufferedLog {
    buffer_log_methods! {
        stage => Stage,
        info  => Info,
        debug => Debug,
        warn  => Warn,
        error => Error,
    }

    fn record_script(&self, name: &str, status: ScriptStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.scripts.lock() {
            guard.push(ScriptEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    fn open_script_log(&self, path: &Path) -> io::Result<()> {
        self.sink.open(path)
    }

    fn close_script_log(&self) {
        self.sink.close();
    }
}
