//! The `home` script: dotfiles and private directories of the user's home.
use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::config::machines::MachineType;
use crate::resources::chmod::ChmodResource;
use crate::resources::line::LineInFileResource;
use crate::resources::link::LinkResource;
use crate::resources::{Resource, ensure, ensure_all};
use crate::runner::{Context, UpdateScript, Updates, only_if_any_type};

/// Dotfiles linked from the configs directory: `(source name, home entry)`.
pub const DOTFILES: &[(&str, &str)] = &[
    ("my_bashrc", ".my_bashrc"),
    ("vimrc", ".vimrc"),
    ("gitconfig", ".gitconfig"),
];

/// Entry in the home directory sourced from `~/.bashrc`.
const BASHRC_HOOK: &str = ".my_bashrc";

/// Settings key of the private directory.
const PRIVATE_DIR_KEY: &str = "private_dir";

/// Default private directory.
const DEFAULT_PRIVATE_DIR: &str = "~/.private";

/// Home-directory configuration.
#[derive(Debug, Default)]
pub struct HomeScript;

impl UpdateScript for HomeScript {
    fn pre_run(&mut self, ctx: &Context) -> Result<()> {
        if ctx.is_of_any_type(&[MachineType::OfficeDesktop]) {
            let clone = ctx.home.join(".Nest");
            ctx.log.info(&format!(
                "{} is an office desktop; using the nest clone in {}",
                ctx.hostname,
                clone.display()
            ));
            ctx.set_nest_dir(&clone)?;
        }
        Ok(())
    }

    fn updates(&self) -> Updates {
        Updates::new()
            .step(link_dotfiles)
            .step(hook_bashrc)
            .step(only_if_any_type(&[MachineType::Server], install_authorized_keys))
            .step(create_private_dir)
    }
}

/// Directory holding the dotfile sources.
fn configs_dir(ctx: &Context) -> PathBuf {
    ctx.setting("configs")
        .map_or_else(|| ctx.nest_dir().join("Configs"), |v| ctx.expand_path(v))
}

fn link_dotfiles(ctx: &Context) -> Result<()> {
    let configs = configs_dir(ctx);
    let links: Vec<LinkResource> = DOTFILES
        .iter()
        .map(|(source, target)| LinkResource::symlink(configs.join(source), ctx.home.join(target)))
        .collect();
    let resources: Vec<&dyn Resource> = links.iter().map(|l| l as &dyn Resource).collect();
    let stats = ensure_all(ctx, &resources)?;
    ctx.log.info(&format!("dotfiles: {}", stats.summary()));
    Ok(())
}

fn hook_bashrc(ctx: &Context) -> Result<()> {
    let hook = ctx.home.join(BASHRC_HOOK);
    let bashrc = ctx.home.join(".bashrc");
    ensure(
        ctx,
        &LineInFileResource::new(bashrc, format!("source '{}'", hook.display())),
    )?;
    Ok(())
}

fn install_authorized_keys(ctx: &Context) -> Result<()> {
    let source = configs_dir(ctx).join("ssh").join("authorized_keys");
    let target = ctx.home.join(".ssh").join("authorized_keys");
    ensure(ctx, &LinkResource::hard(source, target.clone()))?;
    ensure(ctx, &ChmodResource::new(target, 0o640))?;
    Ok(())
}

fn create_private_dir(ctx: &Context) -> Result<()> {
    let dir = ctx.expand_path(ctx.setting(PRIVATE_DIR_KEY).unwrap_or(DEFAULT_PRIVATE_DIR));
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    ensure(ctx, &ChmodResource::new(dir, 0o700))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::error::NotApplicable;
    use crate::exec::test_helpers::MockExecutor;
    use crate::runner::context::test_helpers::context_for;
    use std::path::Path;

    fn seed_configs(home: &Path) -> PathBuf {
        let configs = home.join("Nest/Configs");
        std::fs::create_dir_all(configs.join("ssh")).unwrap();
        for (source, _) in DOTFILES {
            std::fs::write(configs.join(source), format!("# {source}\n")).unwrap();
        }
        std::fs::write(configs.join("ssh/authorized_keys"), "ssh-ed25519 AAAA\n").unwrap();
        configs
    }

    #[test]
    fn has_four_updates() {
        assert_eq!(HomeScript.updates().len(), 4);
    }

    #[cfg(unix)]
    #[test]
    fn dotfiles_are_linked_idempotently() {
        let tmp = tempfile::tempdir().unwrap();
        let configs = seed_configs(tmp.path());
        let (ctx, log) = context_for("terra", tmp.path(), MockExecutor::with_responses(vec![]));

        link_dotfiles(&ctx).unwrap();
        assert_eq!(
            std::fs::read_link(tmp.path().join(".vimrc")).unwrap(),
            configs.join("vimrc")
        );
        link_dotfiles(&ctx).unwrap();
        let messages = log.messages();
        assert!(messages.contains(&"INFO dotfiles: 3 changed, 0 already ok".to_string()));
        assert!(messages.contains(&"INFO dotfiles: 0 changed, 3 already ok".to_string()));
    }

    #[test]
    fn bashrc_hook_is_appended_once() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, _log) = context_for("terra", tmp.path(), MockExecutor::with_responses(vec![]));
        std::fs::write(tmp.path().join(".bashrc"), "# system defaults\n").unwrap();

        hook_bashrc(&ctx).unwrap();
        hook_bashrc(&ctx).unwrap();

        let bashrc = std::fs::read_to_string(tmp.path().join(".bashrc")).unwrap();
        let line = format!("source '{}'", tmp.path().join(".my_bashrc").display());
        assert_eq!(bashrc, format!("# system defaults\n{line}\n"));
    }

    #[cfg(unix)]
    #[test]
    fn authorized_keys_only_on_servers() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        seed_configs(tmp.path());
        let updates = HomeScript.updates();
        let step = updates.get(3).unwrap();

        let (laptop, _log) = context_for("laptop1", tmp.path(), MockExecutor::with_responses(vec![]));
        let err = step(&laptop).unwrap_err();
        assert!(err.downcast_ref::<NotApplicable>().is_some());
        assert!(!tmp.path().join(".ssh").exists());

        let (server, _log) = context_for("maco", tmp.path(), MockExecutor::with_responses(vec![]));
        step(&server).unwrap();
        let keys = tmp.path().join(".ssh/authorized_keys");
        let mode = std::fs::metadata(&keys).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o640);
        assert_eq!(std::fs::read_to_string(&keys).unwrap(), "ssh-ed25519 AAAA\n");
    }

    #[cfg(unix)]
    #[test]
    fn private_dir_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let (ctx, _log) = context_for("terra", tmp.path(), MockExecutor::with_responses(vec![]));
        create_private_dir(&ctx).unwrap();
        let mode = std::fs::metadata(tmp.path().join(".private"))
            .unwrap()
            .permissions()
            .mode()
            & 0o7777;
        assert_eq!(mode, 0o700);
    }

    #[test]
    fn office_desktop_uses_nest_clone() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join(".Nest")).unwrap();
        let (ctx, _log) = context_for("work", tmp.path(), MockExecutor::with_responses(vec![]));
        HomeScript.pre_run(&ctx).unwrap();
        assert_eq!(ctx.nest_dir(), tmp.path().join(".Nest"));
        assert_eq!(configs_dir(&ctx), tmp.path().join(".Nest/Configs"));
    }

    #[test]
    fn office_desktop_without_clone_fails_pre_run() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, _log) = context_for("work", tmp.path(), MockExecutor::with_responses(vec![]));
        assert!(HomeScript.pre_run(&ctx).is_err());
    }
}
