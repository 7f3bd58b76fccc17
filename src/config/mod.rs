//! Configuration discovery and loading.
//!
//! Everything lives in one TOML file (`homeconf.toml`):
//!
//! ```toml
//! [general]
//! nest_dir = "~/Nest"
//! email = "jane@example.org"
//!
//! [[machines]]
//! hostname = "terra"
//! description = "Home desktop"
//! types = ["home_desktop"]
//!
//! [[scripts]]
//! name = "home"
//! store = "~/.homeconf/home"
//! description = "Home directory configuration"
//! ```
pub mod ini;
pub mod machines;
pub mod scripts;
pub mod settings;
pub mod toml_loader;
pub mod validation;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

use machines::{MachineEntry, MachineRegistry};
use scripts::{ScriptEntry, ScriptRegistry};
use settings::Settings;

/// File name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "homeconf.toml";

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "HOMECONF_CONFIG";

/// System-wide configuration file, tried last.
const SYSTEM_CONFIG: &str = "/etc/homeconf/homeconf.toml";

/// On-disk shape of `homeconf.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    general: BTreeMap<String, String>,
    #[serde(default)]
    machines: Vec<MachineEntry>,
    #[serde(default)]
    scripts: Vec<ScriptEntry>,
}

/// All loaded configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// File the configuration was read from.
    pub path: PathBuf,
    /// Shared `[general]` settings.
    pub settings: Settings,
    /// Known machines.
    pub machines: MachineRegistry,
    /// Known scripts, in declaration order.
    pub scripts: ScriptRegistry,
}

impl Config {
    /// Locate the configuration file.
    ///
    /// Tried in order: `explicit` (the `--config` flag), `from_env`
    /// (`$HOMECONF_CONFIG`), `<home>/.homeconf/homeconf.toml`, then
    /// `/etc/homeconf/homeconf.toml`. An explicit path or environment value is
    /// used as-is even if missing, so that the read error names it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] when no default location exists.
    pub fn locate(
        explicit: Option<&Path>,
        from_env: Option<PathBuf>,
        home: &Path,
    ) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = from_env.filter(|p| !p.as_os_str().is_empty()) {
            return Ok(path);
        }
        let candidates = [
            home.join(".homeconf").join(CONFIG_FILE_NAME),
            PathBuf::from(SYSTEM_CONFIG),
        ];
        if let Some(found) = candidates.iter().find(|p| p.is_file()) {
            return Ok(dunce::canonicalize(found).unwrap_or_else(|_| found.clone()));
        }
        Err(ConfigError::NotFound {
            searched: candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Read and parse the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// fails registry validation (unknown machine type, duplicate entries,
    /// missing store directory).
    pub fn load(path: &Path, home: &Path) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml_loader::load_config(path)?;
        Self::from_file(file, path, home)
    }

    /// Parse configuration from a string; `path` is used for messages only.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`], minus the read error.
    pub fn parse(content: &str, path: &Path, home: &Path) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml_loader::parse_config(content, path)?;
        Self::from_file(file, path, home)
    }

    fn from_file(file: ConfigFile, path: &Path, home: &Path) -> Result<Self, ConfigError> {
        let settings = Settings::new(file.general, home.to_path_buf());
        let machines = MachineRegistry::from_entries(file.machines)?;
        let scripts = ScriptRegistry::from_entries(file.scripts, &settings)?;
        Ok(Self {
            path: path.to_path_buf(),
            settings,
            machines,
            scripts,
        })
    }
}
