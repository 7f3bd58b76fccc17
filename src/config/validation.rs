use super::Config;

/// A validation warning detected during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The configuration section (e.g., "machines", "scripts").
    pub source: String,
    /// The specific item that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Create a warning.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.source, self.item, self.message)
    }
}

/// Trait for configuration validators.
///
/// Validators report problems that do not prevent loading but are likely
/// mistakes, such as a script pointing at an implementation nobody provides.
pub trait ConfigValidator {
    /// Validate the configuration and return any warnings found.
    fn validate(&self, config: &Config) -> Vec<ValidationWarning>;
}

/// Checks machine entries and whether the current host is registered.
#[derive(Debug)]
pub struct MachineValidator<'a> {
    hostname: &'a str,
}

impl<'a> MachineValidator<'a> {
    /// Validate against the current `hostname`.
    #[must_use]
    pub const fn new(hostname: &'a str) -> Self {
        Self { hostname }
    }
}

impl ConfigValidator for MachineValidator<'_> {
    fn validate(&self, config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        for machine in config.machines.iter() {
            if machine.types.is_empty() {
                warnings.push(ValidationWarning::new(
                    "machines",
                    &machine.hostname,
                    "declares no machine types; type-gated updates will all be skipped",
                ));
            }
        }
        if !config.machines.is_known(self.hostname) {
            warnings.push(ValidationWarning::new(
                "machines",
                self.hostname,
                "current host is not registered; scripts will refuse to run",
            ));
        }
        warnings
    }
}

/// Checks that every script names a known implementation.
#[derive(Debug)]
pub struct ScriptValidator<'a> {
    implementations: &'a [&'a str],
}

impl<'a> ScriptValidator<'a> {
    /// Validate against the implementation keys the factory provides.
    #[must_use]
    pub const fn new(implementations: &'a [&'a str]) -> Self {
        Self { implementations }
    }
}

impl ConfigValidator for ScriptValidator<'_> {
    fn validate(&self, config: &Config) -> Vec<ValidationWarning> {
        config
            .scripts
            .iter()
            .filter(|s| !self.implementations.contains(&s.implementation.as_str()))
            .map(|s| {
                ValidationWarning::new(
                    "scripts",
                    &s.name,
                    format!("implementation '{}' is not registered", s.implementation),
                )
            })
            .collect()
    }
}

/// Checks shared settings.
#[derive(Debug, Default)]
pub struct SettingsValidator;

impl ConfigValidator for SettingsValidator {
    fn validate(&self, config: &Config) -> Vec<ValidationWarning> {
        let nest = config.settings.nest_dir();
        if nest.is_dir() {
            Vec::new()
        } else {
            vec![ValidationWarning::new(
                "general",
                "nest_dir",
                format!("nest directory {} does not exist", nest.display()),
            )]
        }
    }
}

/// Run every validator and collect the warnings in order.
#[must_use]
pub fn validate_all(
    config: &Config,
    hostname: &str,
    implementations: &[&str],
) -> Vec<ValidationWarning> {
    let validators: [&dyn ConfigValidator; 3] = [
        &SettingsValidator,
        &MachineValidator::new(hostname),
        &ScriptValidator::new(implementations),
    ];
    validators
        .iter()
        .flat_map(|v| v.validate(config))
        .collect()
}
