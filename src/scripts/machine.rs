//! The `machine` script: system packages and services. Runs as root.
use anyhow::{Result, bail};

use crate::config::machines::MachineType;
use crate::resources::package::{
    PACKAGE_MANAGER, PackageResource, batch_install_packages, get_installed_packages,
};
use crate::resources::service::{ServiceAction, ServiceResource};
use crate::resources::{Resource, ResourceState, ensure_all};
use crate::runner::{
    Context, UpdateScript, Updates, only_if_any_type, only_if_hostname, unless_any_type,
};

/// Packages every machine gets.
pub const BASE_PACKAGES: &[&str] = &["vim-enhanced", "git", "tmux", "rsync", "htop"];

/// Extra packages for desktops.
pub const DESKTOP_PACKAGES: &[&str] = &["meld", "gimp", "vlc"];

/// Services started at boot on everything but laptops.
pub const ALWAYS_ON_SERVICES: &[&str] = &["sshd", "crond"];

/// Services laptops do not start at boot.
pub const LAPTOP_DISABLED_SERVICES: &[&str] = &["sshd", "httpd"];

/// Hosts running the `PostgreSQL` server.
const DATABASE_HOSTS: &[&str] = &["maco"];

/// Machine-wide configuration.
#[derive(Debug, Default)]
pub struct MachineScript;

impl UpdateScript for MachineScript {
    fn pre_run(&mut self, ctx: &Context) -> Result<()> {
        if !ctx.executor.which(PACKAGE_MANAGER) {
            bail!("{PACKAGE_MANAGER} not found on PATH");
        }
        Ok(())
    }

    fn updates(&self) -> Updates {
        Updates::new()
            .step(|ctx| install_packages(ctx, BASE_PACKAGES))
            .step(unless_any_type(&[MachineType::Laptop], |ctx| {
                configure_services(ctx, ALWAYS_ON_SERVICES, ServiceAction::Enable)
            }))
            .step(only_if_any_type(&[MachineType::Laptop], |ctx| {
                configure_services(ctx, LAPTOP_DISABLED_SERVICES, ServiceAction::Disable)
            }))
            .step(only_if_any_type(
                &[MachineType::HomeDesktop, MachineType::OfficeDesktop],
                |ctx| install_packages(ctx, DESKTOP_PACKAGES),
            ))
            .step(only_if_hostname(DATABASE_HOSTS, |ctx| {
                install_packages(ctx, &["postgresql-server"])?;
                configure_services(ctx, &["postgresql"], ServiceAction::Enable)
            }))
    }
}

/// Install whichever of `names` is missing with one package-manager call.
fn install_packages(ctx: &Context, names: &[&str]) -> Result<()> {
    ctx.check_abort()?;
    let executor = &*ctx.executor;
    let installed = get_installed_packages(executor)?;
    let resources: Vec<PackageResource<'_>> = names
        .iter()
        .map(|name| PackageResource::new(*name, executor))
        .collect();
    let missing: Vec<&PackageResource<'_>> = resources
        .iter()
        .filter(|r| r.state_from_installed(&installed) != ResourceState::Correct)
        .collect();
    if missing.is_empty() {
        ctx.log
            .debug(&format!("all {} packages already installed", names.len()));
        return Ok(());
    }
    batch_install_packages(&missing)?;
    let list = missing.iter().map(|r| r.name.as_str()).collect::<Vec<_>>();
    ctx.log
        .info(&format!("installed packages: {}", list.join(", ")));
    Ok(())
}

fn configure_services(ctx: &Context, names: &[&str], action: ServiceAction) -> Result<()> {
    let executor = &*ctx.executor;
    let services: Vec<ServiceResource<'_>> = names
        .iter()
        .map(|name| ServiceResource::new(name, action, executor))
        .collect();
    let resources: Vec<&dyn Resource> = services.iter().map(|s| s as &dyn Resource).collect();
    let stats = ensure_all(ctx, &resources)?;
    ctx.log.info(&format!("services ({action}): {}", stats.summary()));
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::error::NotApplicable;
    use crate::exec::test_helpers::MockExecutor;
    use crate::runner::context::test_helpers::context_for;

    fn responses(items: &[(bool, &str)]) -> MockExecutor {
        MockExecutor::with_responses(items.iter().map(|(ok, out)| (*ok, (*out).to_string())).collect())
    }

    #[test]
    fn pre_run_requires_package_manager() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, _log) = context_for("terra", tmp.path(), MockExecutor::with_responses(vec![]));
        let err = MachineScript.pre_run(&ctx).unwrap_err();
        assert_eq!(err.to_string(), "dnf not found on PATH");

        let (ctx, _log) = context_for(
            "terra",
            tmp.path(),
            MockExecutor::with_responses(vec![]).with_which(true),
        );
        MachineScript.pre_run(&ctx).unwrap();
    }

    #[test]
    fn installs_only_missing_packages() {
        let tmp = tempfile::tempdir().unwrap();
        let executor = responses(&[(true, "git\nrsync\nbash\n"), (true, "")]);
        let (ctx, log) = context_for("terra", tmp.path(), executor);

        install_packages(&ctx, BASE_PACKAGES).unwrap();

        assert!(
            log.messages()
                .contains(&"INFO installed packages: vim-enhanced, tmux, htop".to_string())
        );
    }

    #[test]
    fn nothing_to_install_runs_no_dnf() {
        let tmp = tempfile::tempdir().unwrap();
        let executor = responses(&[(true, "meld\ngimp\nvlc\n")]);
        let (ctx, log) = context_for("terra", tmp.path(), executor);
        install_packages(&ctx, DESKTOP_PACKAGES).unwrap();
        assert_eq!(log.messages(), vec!["DEBUG all 3 packages already installed"]);
    }

    #[test]
    fn services_step_is_skipped_on_laptops() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, _log) = context_for("laptop1", tmp.path(), MockExecutor::with_responses(vec![]));
        let updates = MachineScript.updates();
        let err = updates.get(2).unwrap()(&ctx).unwrap_err();
        assert!(err.downcast_ref::<NotApplicable>().is_some());
    }

    #[test]
    fn laptop_disables_services() {
        let tmp = tempfile::tempdir().unwrap();
        let executor = responses(&[
            (true, "enabled\n"),
            (true, ""),
            (false, "disabled\n"),
        ]);
        let (ctx, log) = context_for("laptop1", tmp.path(), executor);
        let updates = MachineScript.updates();
        updates.get(3).unwrap()(&ctx).unwrap();
        assert!(
            log.messages()
                .contains(&"INFO services (disable): 1 changed, 1 already ok".to_string())
        );
    }

    #[test]
    fn database_step_only_on_listed_host() {
        let tmp = tempfile::tempdir().unwrap();
        let updates = MachineScript.updates();
        let step = updates.get(5).unwrap();

        let (terra, _log) = context_for("terra", tmp.path(), MockExecutor::with_responses(vec![]));
        assert!(step(&terra).unwrap_err().downcast_ref::<NotApplicable>().is_some());

        let executor = responses(&[
            (true, "bash\n"),
            (true, ""),
            (false, "disabled\n"),
            (true, ""),
        ]);
        let (maco, log) = context_for("maco", tmp.path(), executor);
        step(&maco).unwrap();
        let messages = log.messages();
        assert!(messages.contains(&"INFO installed packages: postgresql-server".to_string()));
        assert!(messages.contains(&"INFO enable postgresql.service".to_string()));
    }

    #[test]
    fn failing_dnf_fails_the_step() {
        let tmp = tempfile::tempdir().unwrap();
        let executor = responses(&[(true, ""), (false, "")]);
        let (ctx, _log) = context_for("terra", tmp.path(), executor);
        assert!(install_packages(&ctx, &["git"]).is_err());
    }
}
