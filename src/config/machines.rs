//! Machine registry: hostname → declared machine types.
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::Deserialize;

use crate::error::ConfigError;

/// The fixed enumeration of machine types update scripts can gate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MachineType {
    /// A personal laptop.
    Laptop,
    /// The machine hosting shared services (VCS, web, mail, DNS).
    Server,
    /// A desktop at the office.
    OfficeDesktop,
    /// The desktop at home, on the same network as the server.
    HomeDesktop,
}

impl MachineType {
    /// Every known machine type, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Laptop,
        Self::Server,
        Self::OfficeDesktop,
        Self::HomeDesktop,
    ];

    /// Parse a configuration tag (e.g. `"home_desktop"`).
    ///
    /// # Examples
    ///
    /// ```
    /// use homeconf_cli::config::machines::MachineType;
    ///
    /// assert_eq!(MachineType::from_tag("server"), Some(MachineType::Server));
    /// assert_eq!(MachineType::from_tag(" Laptop "), Some(MachineType::Laptop));
    /// assert_eq!(MachineType::from_tag("mainframe"), None);
    /// ```
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "laptop" => Some(Self::Laptop),
            "server" => Some(Self::Server),
            "office_desktop" => Some(Self::OfficeDesktop),
            "home_desktop" => Some(Self::HomeDesktop),
            _ => None,
        }
    }

    /// The configuration tag for this type.
    #[must_use]
    pub const fn as_tag(self) -> &'static str {
        match self {
            Self::Laptop => "laptop",
            Self::Server => "server",
            Self::OfficeDesktop => "office_desktop",
            Self::HomeDesktop => "home_desktop",
        }
    }
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// A `[[machines]]` entry as written in the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineEntry {
    /// Hostname (unique key).
    pub hostname: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Type tags; must come from [`MachineType`].
    #[serde(default)]
    pub types: Vec<String>,
}

/// A registered machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineRecord {
    /// Hostname (unique key).
    pub hostname: String,
    /// Human-readable description.
    pub description: String,
    /// Declared machine types.
    pub types: BTreeSet<MachineType>,
}

/// Immutable set of known machines, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct MachineRegistry {
    machines: Vec<MachineRecord>,
    index: HashMap<String, usize>,
}

impl MachineRegistry {
    /// Build the registry from configuration entries.
    ///
    /// # Errors
    ///
    /// Fails fast with [`ConfigError::UnknownMachineType`] for a tag outside
    /// the enumeration and [`ConfigError::DuplicateRegistration`] when two
    /// entries share a hostname.
    pub fn from_entries(entries: Vec<MachineEntry>) -> Result<Self, ConfigError> {
        let mut registry = Self::default();
        for entry in entries {
            let types = entry
                .types
                .iter()
                .map(|tag| {
                    MachineType::from_tag(tag).ok_or_else(|| ConfigError::UnknownMachineType {
                        hostname: entry.hostname.clone(),
                        tag: tag.clone(),
                    })
                })
                .collect::<Result<BTreeSet<_>, _>>()?;
            registry.insert(MachineRecord {
                hostname: entry.hostname,
                description: entry.description,
                types,
            })?;
        }
        Ok(registry)
    }

    /// Add a machine.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateRegistration`] if the hostname is taken.
    pub fn insert(&mut self, record: MachineRecord) -> Result<(), ConfigError> {
        if self.index.contains_key(&record.hostname) {
            return Err(ConfigError::DuplicateRegistration {
                kind: "machine",
                name: record.hostname,
            });
        }
        self.index
            .insert(record.hostname.clone(), self.machines.len());
        self.machines.push(record);
        Ok(())
    }

    /// Whether `hostname` is registered.
    #[must_use]
    pub fn is_known(&self, hostname: &str) -> bool {
        self.index.contains_key(hostname)
    }

    /// The record for `hostname`, if registered.
    #[must_use]
    pub fn get(&self, hostname: &str) -> Option<&MachineRecord> {
        self.index
            .get(hostname)
            .and_then(|&i| self.machines.get(i))
    }

    /// Declared types of `hostname`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownMachine`] if the machine is not registered.
    pub fn types_of(&self, hostname: &str) -> Result<&BTreeSet<MachineType>, ConfigError> {
        self.get(hostname)
            .map(|m| &m.types)
            .ok_or_else(|| ConfigError::UnknownMachine(hostname.to_string()))
    }

    /// Whether `hostname` has at least one of `types`.
    ///
    /// An unknown machine is of no type.
    #[must_use]
    pub fn is_of_any_type(&self, hostname: &str, types: &[MachineType]) -> bool {
        self.get(hostname)
            .is_some_and(|m| types.iter().any(|t| m.types.contains(t)))
    }

    /// All machines in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &MachineRecord> {
        self.machines.iter()
    }

    /// Number of registered machines.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.machines.len()
    }

    /// Whether no machine is registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }
}
