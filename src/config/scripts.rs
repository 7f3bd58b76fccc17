//! Script registry: script name → loading metadata.
use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use super::settings::Settings;
use crate::error::ConfigError;

/// A `[[scripts]]` entry as written in the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptEntry {
    /// Unique script name.
    pub name: String,
    /// Factory key of the implementation; defaults to `name`.
    #[serde(default)]
    pub implementation: Option<String>,
    /// Directory holding the version file and the script log (`~`/`${var}` expanded).
    #[serde(default)]
    pub store: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Whether the script must run as root.
    #[serde(default)]
    pub root_required: bool,
}

/// Loading metadata for one update script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDescriptor {
    /// Unique script name.
    pub name: String,
    /// Factory key of the implementation.
    pub implementation: String,
    /// Directory holding `.config_version` and `<name>.log`.
    pub store_dir: PathBuf,
    /// Human-readable description.
    pub description: String,
    /// Whether the script must run as root.
    pub root_required: bool,
}

impl ScriptDescriptor {
    /// Path of the per-script log inside the store directory.
    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.store_dir.join(format!("{}.log", self.name))
    }
}

/// Immutable set of scripts, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ScriptRegistry {
    scripts: Vec<ScriptDescriptor>,
    index: HashMap<String, usize>,
}

impl ScriptRegistry {
    /// Build the registry from configuration entries, expanding store paths
    /// with `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingStoreDir`] for an entry without a store
    /// and [`ConfigError::DuplicateRegistration`] when two entries share a name.
    pub fn from_entries(
        entries: Vec<ScriptEntry>,
        settings: &Settings,
    ) -> Result<Self, ConfigError> {
        let mut registry = Self::default();
        for entry in entries {
            if entry.store.trim().is_empty() {
                return Err(ConfigError::MissingStoreDir(entry.name));
            }
            let store_dir = settings.expand_path(entry.store.trim(), None);
            registry.insert(ScriptDescriptor {
                implementation: entry.implementation.unwrap_or_else(|| entry.name.clone()),
                name: entry.name,
                store_dir,
                description: entry.description,
                root_required: entry.root_required,
            })?;
        }
        Ok(registry)
    }

    /// Add a script.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateRegistration`] if the name is taken.
    pub fn insert(&mut self, descriptor: ScriptDescriptor) -> Result<(), ConfigError> {
        if self.index.contains_key(&descriptor.name) {
            return Err(ConfigError::DuplicateRegistration {
                kind: "script",
                name: descriptor.name,
            });
        }
        self.index
            .insert(descriptor.name.clone(), self.scripts.len());
        self.scripts.push(descriptor);
        Ok(())
    }

    /// Metadata for `name`, if registered.
    #[must_use]
    pub fn describe(&self, name: &str) -> Option<&ScriptDescriptor> {
        self.index.get(name).and_then(|&i| self.scripts.get(i))
    }

    /// Script names in declaration order.
    #[must_use]
    pub fn all_names(&self) -> Vec<&str> {
        self.scripts.iter().map(|s| s.name.as_str()).collect()
    }

    /// All descriptors in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ScriptDescriptor> {
        self.scripts.iter()
    }

    /// Number of registered scripts.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Whether no script is registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}
