use std::collections::BTreeMap;
use std::fmt;

use super::UpdateScript;
use crate::error::ConfigError;

/// Constructor of a fresh script instance.
pub type Constructor = Box<dyn Fn() -> Box<dyn UpdateScript> + Send + Sync>;

/// Map from implementation key to script constructor.
///
/// A [`ScriptDescriptor`](crate::config::scripts::ScriptDescriptor) names its
/// implementation by key; the runner asks the factory for a new instance on
/// every run.
#[derive(Default)]
pub struct ScriptFactory {
    constructors: BTreeMap<String, Constructor>,
}

impl ScriptFactory {
    /// An empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `constructor` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateRegistration`] if `key` is taken.
    pub fn register<F>(&mut self, key: &str, constructor: F) -> Result<(), ConfigError>
    where
        F: Fn() -> Box<dyn UpdateScript> + Send + Sync + 'static,
    {
        if self.constructors.contains_key(key) {
            return Err(ConfigError::DuplicateRegistration {
                kind: "implementation",
                name: key.to_string(),
            });
        }
        self.constructors
            .insert(key.to_string(), Box::new(constructor));
        Ok(())
    }

    /// A new instance of the implementation registered under `key`.
    #[must_use]
    pub fn create(&self, key: &str) -> Option<Box<dyn UpdateScript>> {
        self.constructors.get(key).map(|ctor| ctor())
    }

    /// Whether `key` is registered.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.constructors.contains_key(key)
    }

    /// Registered keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for ScriptFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptFactory")
            .field("keys", &self.keys())
            .finish()
    }
}
