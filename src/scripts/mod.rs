//! Built-in update scripts.
//!
//! Every script registered here can be named as the `implementation` of a
//! `[[scripts]]` entry in the configuration file.
pub mod home;
pub mod machine;

use crate::error::ConfigError;
use crate::runner::ScriptFactory;

/// Implementation keys provided by [`builtin_factory`].
pub const BUILTIN_IMPLEMENTATIONS: &[&str] = &["home", "machine"];

/// Factory with every built-in script registered.
///
/// # Errors
///
/// Returns [`ConfigError::DuplicateRegistration`] if two built-ins share a key.
pub fn builtin_factory() -> Result<ScriptFactory, ConfigError> {
    let mut factory = ScriptFactory::new();
    factory.register("home", || Box::new(home::HomeScript))?;
    factory.register("machine", || Box::new(machine::MachineScript))?;
    Ok(factory)
}
