use std::fmt;
use std::path::Path;

use anyhow::{Result, bail};

use crate::exec::Executor;

/// Identity of the machine and user the runner acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Hostname used as the machine registry key.
    pub hostname: String,
    /// Whether the process runs with root privileges.
    pub is_root: bool,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hostname)?;
        if self.is_root {
            write!(f, " (root)")?;
        }
        Ok(())
    }
}

impl Platform {
    /// Detect the current platform.
    ///
    /// The hostname is taken from `hostname_override`, then `$HOSTNAME`,
    /// then `/etc/hostname`, then `uname -n`. Root is detected with `id -u`.
    ///
    /// # Errors
    ///
    /// Returns an error if no hostname can be determined.
    pub fn detect(hostname_override: Option<&str>, executor: &dyn Executor) -> Result<Self> {
        let hostname = match hostname_override {
            Some(name) => name.trim().to_string(),
            None => detect_hostname(executor)?,
        };
        Ok(Self {
            hostname,
            is_root: detect_root(executor),
        })
    }

    /// Create a platform with explicit values.
    #[must_use]
    pub fn new(hostname: impl Into<String>, is_root: bool) -> Self {
        Self {
            hostname: hostname.into(),
            is_root,
        }
    }
}

fn detect_hostname(executor: &dyn Executor) -> Result<String> {
    let from_env = std::env::var("HOSTNAME").ok();
    let from_file = std::fs::read_to_string(Path::new("/etc/hostname")).ok();
    if let Some(name) = first_hostname([from_env, from_file]) {
        return Ok(name);
    }
    let out = executor.run("uname", &["-n"])?;
    match first_hostname([Some(out.stdout)]) {
        Some(name) => Ok(name),
        None => bail!("cannot determine hostname; pass --hostname"),
    }
}

/// First candidate that holds a non-blank hostname, trimmed.
fn first_hostname<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

fn detect_root(executor: &dyn Executor) -> bool {
    executor
        .run_unchecked("id", &["-u"])
        .is_ok_and(|r| r.success && r.stdout.trim() == "0")
}
