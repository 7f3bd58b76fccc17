pub mod completions;
pub mod machines;
pub mod run;
pub mod version;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::validation::validate_all;
use crate::config::{CONFIG_ENV_VAR, Config};
use crate::exec::Executor;
use crate::logging::Log;
use crate::platform::Platform;
use crate::runner::{Context, ScriptFactory};
use crate::scripts;

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates home resolution, configuration loading, platform detection
/// and validation so that each command does not have to repeat the
/// boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Detected (or overridden) machine identity.
    pub platform: Platform,
    /// Loaded configuration.
    pub config: Config,
    /// Script implementations available to the runner.
    pub factory: ScriptFactory,
    /// Runner context shared by every script of the command.
    pub ctx: Context,
}

impl CommandSetup {
    /// Load configuration and detect the platform, with the built-in scripts
    /// registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined, the
    /// configuration cannot be located or parsed, or no hostname is found.
    pub fn init(
        global: &GlobalOpts,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
    ) -> Result<Self> {
        Self::init_with_factory(global, log, executor, scripts::builtin_factory()?)
    }

    /// Same as [`CommandSetup::init`] with a caller-supplied script factory.
    ///
    /// # Errors
    ///
    /// See [`CommandSetup::init`].
    pub fn init_with_factory(
        global: &GlobalOpts,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
        factory: ScriptFactory,
    ) -> Result<Self> {
        let home = resolve_home(global)?;

        log.stage("Loading configuration");
        let path = Config::locate(
            global.config.as_deref(),
            std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from),
            &home,
        )?;
        log.info(&format!("config: {}", path.display()));
        let config = Config::load(&path, &home)?;
        log.debug(&format!("home: {}", home.display()));
        log.debug(&format!("{} machines", config.machines.len()));
        log.debug(&format!("{} scripts", config.scripts.len()));

        let platform = Platform::detect(global.hostname.as_deref(), &*executor)?;
        log.info(&format!("machine: {platform}"));

        let warnings = validate_all(&config, &platform.hostname, &factory.keys());
        if !warnings.is_empty() {
            log.warn(&format!(
                "found {} configuration warning(s):",
                warnings.len()
            ));
            for warning in &warnings {
                log.warn(&format!("  {warning}"));
            }
        }

        let ctx = Context::new(&config, &platform, log, executor);
        Ok(Self {
            platform,
            config,
            factory,
            ctx,
        })
    }

    /// Route Ctrl-C to the runner's abort flag.
    ///
    /// The running step finishes; the runner stops before the next one.
    pub fn install_interrupt_handler(&self) {
        let flag = self.ctx.abort_flag();
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
            self.ctx
                .log
                .warn(&format!("cannot install interrupt handler: {e}"));
        }
    }
}

/// Home directory being configured: `--home`, else `$HOME`.
///
/// # Errors
///
/// Returns an error if neither is available.
pub fn resolve_home(global: &GlobalOpts) -> Result<PathBuf> {
    if let Some(home) = &global.home {
        return Ok(home.clone());
    }
    std::env::var("HOME")
        .map(PathBuf::from)
        .context("HOME is not set; pass --home")
}


#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::test_helpers::setup_for;
    use super::*;

    const CONFIG: &str = r#"
[[machines]]
hostname = "terra"
types = ["home_desktop"]

[[scripts]]
name = "home"
store = "~/.homeconf/home"

[[scripts]]
name = "legacy"
store = "~/.homeconf/legacy"
"#;

    #[test]
    fn resolve_home_prefers_flag() {
        let global = GlobalOpts {
            home: Some(PathBuf::from("/srv/home")),
            ..GlobalOpts::default()
        };
        assert_eq!(resolve_home(&global).unwrap(), PathBuf::from("/srv/home"));
    }

    #[test]
    fn init_loads_config_and_platform() {
        let tmp = tempfile::tempdir().unwrap();
        let (setup, _log) = setup_for(
            tmp.path(),
            "terra",
            CONFIG,
            scripts::builtin_factory().unwrap(),
        );
        assert_eq!(setup.platform, Platform::new("terra", false));
        assert_eq!(setup.config.scripts.all_names(), vec!["home", "legacy"]);
        assert_eq!(setup.ctx.hostname, "terra");
        assert_eq!(setup.ctx.home, tmp.path());
    }

    #[test]
    fn init_reports_validation_warnings() {
        let tmp = tempfile::tempdir().unwrap();
        let (_setup, log) = setup_for(
            tmp.path(),
            "venus",
            CONFIG,
            scripts::builtin_factory().unwrap(),
        );
        let warnings: Vec<String> = log
            .messages()
            .into_iter()
            .filter(|m| m.starts_with("WARN"))
            .collect();
        assert_eq!(warnings[0], "WARN found 3 configuration warning(s):");
        assert!(warnings.iter().any(|w| w.contains("venus")));
        assert!(warnings.iter().any(|w| w.contains("legacy")));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let global = GlobalOpts {
            config: Some(tmp.path().join("absent.toml")),
            home: Some(tmp.path().to_path_buf()),
            hostname: Some("terra".to_string()),
            ..GlobalOpts::default()
        };
        let err = CommandSetup::init(
            &global,
            Arc::new(crate::logging::BufferedLog::new()),
            Arc::new(crate::exec::test_helpers::MockExecutor::ok("0\n")),
        )
        .unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }
}
