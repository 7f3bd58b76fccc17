//! Package installation resource (dnf / rpm).
use std::collections::HashSet;

use anyhow::Result;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// Package manager used to install packages.
pub const PACKAGE_MANAGER: &str = "dnf";

/// A system package resource that can be checked and installed.
#[derive(Debug)]
pub struct PackageResource<'a> {
    /// Package name.
    pub name: String,
    /// Executor for running package manager commands.
    executor: &'a dyn Executor,
}

impl<'a> PackageResource<'a> {
    /// Create a new package resource.
    #[must_use]
    pub fn new(name: impl Into<String>, executor: &'a dyn Executor) -> Self {
        Self {
            name: name.into(),
            executor,
        }
    }

    /// Determine the resource state from a pre-fetched set of installed package names.
    ///
    /// This avoids running a per-package query when used with
    /// [`get_installed_packages`].
    #[must_use]
    pub fn state_from_installed(&self, installed: &HashSet<String>) -> ResourceState {
        if installed.contains(&self.name) {
            ResourceState::Correct
        } else {
            ResourceState::Missing
        }
    }
}

/// Query the full set of installed package names with a single `rpm -qa`.
///
/// A failing query yields an empty set, so every package is treated as
/// missing and handed to `dnf`, which skips what is already there.
///
/// # Errors
///
/// Returns an error if `rpm` cannot be started.
pub fn get_installed_packages(executor: &dyn Executor) -> Result<HashSet<String>> {
    let result = executor.run_unchecked("rpm", &["-qa", "--queryformat", "%{NAME}\\n"])?;
    let mut set = HashSet::new();
    if result.success {
        for line in result.stdout.lines() {
            let name = line.trim();
            if !name.is_empty() {
                set.insert(name.to_string());
            }
        }
    }
    Ok(set)
}

/// Install a batch of packages in a single `dnf install -y` command.
///
/// # Errors
///
/// Returns an error if the package manager command fails.
pub fn batch_install_packages(resources: &[&PackageResource<'_>]) -> Result<()> {
    let Some(first) = resources.first() else {
        return Ok(());
    };
    let mut args = vec!["install", "-y"];
    args.extend(resources.iter().map(|r| r.name.as_str()));
    first.executor.run(PACKAGE_MANAGER, &args)?;
    Ok(())
}

impl Applicable for PackageResource<'_> {
    fn description(&self) -> String {
        format!("{} ({PACKAGE_MANAGER})", self.name)
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.executor
            .run(PACKAGE_MANAGER, &["install", "-y", &self.name])?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for PackageResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let result = self.executor.run_unchecked("rpm", &["-q", &self.name])?;
        if result.success {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Missing)
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::exec::test_helpers::MockExecutor;

    #[test]
    fn description_includes_manager() {
        let executor = MockExecutor::with_responses(vec![]);
        let resource = PackageResource::new("git", &executor);
        assert_eq!(resource.description(), "git (dnf)");
    }

    #[test]
    fn state_from_installed() {
        let executor = MockExecutor::with_responses(vec![]);
        let resource = PackageResource::new("git", &executor);
        let mut installed = HashSet::new();
        assert_eq!(
            resource.state_from_installed(&installed),
            ResourceState::Missing
        );
        installed.insert("git".to_string());
        assert_eq!(
            resource.state_from_installed(&installed),
            ResourceState::Correct
        );
    }

    #[test]
    fn get_installed_parses_one_name_per_line() {
        let executor = MockExecutor::ok("git\nvim-enhanced\n\ntmux\n");
        let installed = get_installed_packages(&executor).unwrap();
        assert_eq!(installed.len(), 3);
        assert!(installed.contains("vim-enhanced"));
        assert_eq!(
            executor.recorded_calls(),
            vec!["rpm -qa --queryformat %{NAME}\\n"]
        );
    }

    #[test]
    fn get_installed_empty_on_failure() {
        let executor = MockExecutor::fail();
        assert!(get_installed_packages(&executor).unwrap().is_empty());
    }

    #[test]
    fn current_state_follows_rpm_query() {
        let executor =
            MockExecutor::with_responses(vec![(true, "git-2.43".to_string()), (false, String::new())]);
        let resource = PackageResource::new("git", &executor);
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
        assert_eq!(resource.current_state().unwrap(), ResourceState::Missing);
        assert_eq!(executor.recorded_calls(), vec!["rpm -q git", "rpm -q git"]);
    }

    #[test]
    fn apply_runs_dnf() {
        let executor = MockExecutor::ok("");
        let resource = PackageResource::new("tmux", &executor);
        assert_eq!(resource.apply().unwrap(), ResourceChange::Applied);
        assert_eq!(executor.recorded_calls(), vec!["dnf install -y tmux"]);
    }

    #[test]
    fn batch_install_groups_into_single_command() {
        let executor = MockExecutor::ok("");
        let r1 = PackageResource::new("git", &executor);
        let r2 = PackageResource::new("vim-enhanced", &executor);
        batch_install_packages(&[&r1, &r2]).unwrap();
        assert_eq!(
            executor.recorded_calls(),
            vec!["dnf install -y git vim-enhanced"]
        );
    }

    #[test]
    fn batch_install_empty_list_is_noop() {
        let resources: &[&PackageResource<'_>] = &[];
        batch_install_packages(resources).unwrap();
    }

    #[test]
    fn batch_install_propagates_error() {
        let executor = MockExecutor::fail();
        let r1 = PackageResource::new("git", &executor);
        assert!(batch_install_packages(&[&r1]).is_err());
    }
}
