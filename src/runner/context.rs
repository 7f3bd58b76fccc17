use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use anyhow::{Result, bail};

use crate::config::Config;
use crate::config::machines::{MachineRegistry, MachineType};
use crate::config::settings::Settings;
use crate::error::{AbortConfig, ConfigError};
use crate::exec::Executor;
use crate::logging::Log;
use crate::platform::Platform;

/// Shared context handed to update scripts.
///
/// Exposes machine-registry queries for the current host, the shared
/// `[general]` settings, the logger and the command executor.
pub struct Context {
    /// Shared `[general]` settings.
    pub settings: Arc<Settings>,
    /// Known machines.
    pub machines: Arc<MachineRegistry>,
    /// Hostname of the machine being configured.
    pub hostname: String,
    /// Home directory being configured.
    pub home: PathBuf,
    /// Whether the process runs as root.
    pub is_root: bool,
    /// Logger for output and script recording.
    pub log: Arc<dyn Log>,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Nest directory redirected by a script's pre-run hook.
    nest_override: RwLock<Option<PathBuf>>,
    /// Set when the operator asked to stop (Ctrl-C).
    abort: Arc<AtomicBool>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("settings", &self.settings)
            .field("machines", &self.machines.len())
            .field("hostname", &self.hostname)
            .field("home", &self.home)
            .field("is_root", &self.is_root)
            .field("log", &"<dyn Log>")
            .field("executor", &"<dyn Executor>")
            .field("nest_override", &self.nest_override)
            .field("abort", &self.abort)
            .finish()
    }
}

impl Context {
    /// Creates a new context for running scripts on `platform`.
    #[must_use]
    pub fn new(
        config: &Config,
        platform: &Platform,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            settings: Arc::new(config.settings.clone()),
            machines: Arc::new(config.machines.clone()),
            hostname: platform.hostname.clone(),
            home: config.settings.home().to_path_buf(),
            is_root: platform.is_root,
            log,
            executor,
            nest_override: RwLock::new(None),
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Declared types of the current machine.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownMachine`] if the host is not registered.
    pub fn machine_types(&self) -> Result<&BTreeSet<MachineType>, ConfigError> {
        self.machines.types_of(&self.hostname)
    }

    /// Whether the current machine has at least one of `types`.
    #[must_use]
    pub fn is_of_any_type(&self, types: &[MachineType]) -> bool {
        self.machines.is_of_any_type(&self.hostname, types)
    }

    /// Whether the current hostname is one of `names`.
    #[must_use]
    pub fn is_host<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().any(|n| n.as_ref() == self.hostname)
    }

    /// Raw `[general]` value for `key`.
    #[must_use]
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key)
    }

    /// Expanded `[general]` value for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error naming the key if it is not configured.
    pub fn require_setting(&self, key: &str) -> Result<String> {
        match self.settings.get(key) {
            Some(value) => Ok(self.expand(value)),
            None => bail!("setting '{key}' is required but missing from [general]"),
        }
    }

    /// The nest directory, honouring a redirect made with
    /// [`set_nest_dir`](Self::set_nest_dir).
    #[must_use]
    pub fn nest_dir(&self) -> PathBuf {
        self.nest_override_path()
            .unwrap_or_else(|| self.settings.nest_dir())
    }

    /// Redirect the nest directory for the rest of the process.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` is not an existing directory.
    pub fn set_nest_dir(&self, dir: &Path) -> Result<()> {
        let dir = self.settings.expand_path(&dir.to_string_lossy(), None);
        if !dir.is_dir() {
            bail!("nest directory {} does not exist", dir.display());
        }
        self.log.debug(&format!("nest directory set to {}", dir.display()));
        *self
            .nest_override
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(dir);
        Ok(())
    }

    /// Expand `~/` and `${var}` references against settings and the nest.
    #[must_use]
    pub fn expand(&self, input: &str) -> String {
        self.settings
            .expand(input, self.nest_override_path().as_deref())
    }

    /// [`expand`](Self::expand) and interpret as a path.
    #[must_use]
    pub fn expand_path(&self, input: &str) -> PathBuf {
        PathBuf::from(self.expand(input))
    }

    /// Flag that stops the run at the next step boundary when set.
    #[must_use]
    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    /// Ask the runner to stop before the next step.
    pub fn request_abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    /// Whether an abort was requested.
    #[must_use]
    pub fn abort_requested(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    /// Fail with an [`AbortConfig`] signal if an abort was requested.
    ///
    /// Long steps call this between sub-actions.
    ///
    /// # Errors
    ///
    /// Returns the abort signal.
    pub fn check_abort(&self) -> Result<()> {
        if self.abort_requested() {
            return Err(AbortConfig::new("interrupted by operator").into());
        }
        Ok(())
    }

    fn nest_override_path(&self) -> Option<PathBuf> {
        self.nest_override
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}
