//! systemd service resource.
use std::fmt;

use anyhow::Result;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// Desired boot-time state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    /// Start at boot.
    Enable,
    /// Do not start at boot.
    Disable,
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enable => f.write_str("enable"),
            Self::Disable => f.write_str("disable"),
        }
    }
}

/// A systemd system service that can be checked and enabled or disabled.
#[derive(Debug)]
pub struct ServiceResource<'a> {
    /// Unit name; `.service` is appended when no suffix is given.
    pub name: String,
    /// Desired state.
    pub action: ServiceAction,
    executor: &'a dyn Executor,
}

impl<'a> ServiceResource<'a> {
    /// Create a new service resource.
    #[must_use]
    pub fn new(name: &str, action: ServiceAction, executor: &'a dyn Executor) -> Self {
        let name = if name.contains('.') {
            name.to_string()
        } else {
            format!("{name}.service")
        };
        Self {
            name,
            action,
            executor,
        }
    }

    /// A service that should start at boot.
    #[must_use]
    pub fn enabled(name: &str, executor: &'a dyn Executor) -> Self {
        Self::new(name, ServiceAction::Enable, executor)
    }

    /// A service that should not start at boot.
    #[must_use]
    pub fn disabled(name: &str, executor: &'a dyn Executor) -> Self {
        Self::new(name, ServiceAction::Disable, executor)
    }
}

impl Applicable for ServiceResource<'_> {
    fn description(&self) -> String {
        format!("{} {}", self.action, self.name)
    }

    fn apply(&self) -> Result<ResourceChange> {
        let verb = self.action.to_string();
        self.executor.run("systemctl", &[&verb, &self.name])?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for ServiceResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let result = self
            .executor
            .run_unchecked("systemctl", &["is-enabled", &self.name])?;
        let status = result.stdout.trim();
        if status == "not-found" || (!result.success && status.is_empty()) {
            return Ok(ResourceState::Invalid {
                reason: format!("unit {} is not installed", self.name),
            });
        }
        let enabled = result.success && status == "enabled";
        match (self.action, enabled) {
            (ServiceAction::Enable, true) | (ServiceAction::Disable, false) => {
                Ok(ResourceState::Correct)
            }
            (ServiceAction::Enable, false) => Ok(ResourceState::Incorrect {
                current: status.to_string(),
            }),
            (ServiceAction::Disable, true) => Ok(ResourceState::Incorrect {
                current: "enabled".to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::exec::test_helpers::MockExecutor;

    #[test]
    fn service_suffix_is_added() {
        let executor = MockExecutor::with_responses(vec![]);
        assert_eq!(ServiceResource::enabled("sshd", &executor).name, "sshd.service");
        assert_eq!(
            ServiceResource::enabled("fstrim.timer", &executor).name,
            "fstrim.timer"
        );
        assert_eq!(
            ServiceResource::disabled("bluetooth", &executor).description(),
            "disable bluetooth.service"
        );
    }

    #[test]
    fn enable_state_follows_is_enabled() {
        let executor = MockExecutor::with_responses(vec![
            (true, "enabled\n".to_string()),
            (false, "disabled\n".to_string()),
        ]);
        let resource = ServiceResource::enabled("sshd", &executor);
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
        assert_eq!(
            resource.current_state().unwrap(),
            ResourceState::Incorrect {
                current: "disabled".to_string()
            }
        );
    }

    #[test]
    fn disable_state_is_the_complement() {
        let executor = MockExecutor::with_responses(vec![
            (true, "enabled\n".to_string()),
            (false, "disabled\n".to_string()),
        ]);
        let resource = ServiceResource::disabled("bluetooth", &executor);
        assert!(resource.needs_change().unwrap());
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn unknown_unit_is_invalid() {
        let executor = MockExecutor::with_responses(vec![(false, "not-found\n".to_string())]);
        let resource = ServiceResource::enabled("nope", &executor);
        assert!(matches!(
            resource.current_state().unwrap(),
            ResourceState::Invalid { .. }
        ));
    }

    #[test]
    fn apply_runs_systemctl() {
        let executor = MockExecutor::ok("");
        let resource = ServiceResource::disabled("bluetooth", &executor);
        assert_eq!(resource.apply().unwrap(), ResourceChange::Applied);
        assert_eq!(
            executor.recorded_calls(),
            vec!["systemctl disable bluetooth.service"]
        );
    }
}
