use anyhow::{Context as _, Result};
use std::path::PathBuf;

use super::{Applicable, Resource, ResourceChange, ResourceState};

/// A file permission resource that can be checked and applied (Unix only).
#[derive(Debug, Clone)]
pub struct ChmodResource {
    /// Target file or directory (absolute).
    pub target: PathBuf,
    /// Permission bits (e.g. `0o640`).
    pub mode: u32,
}

impl ChmodResource {
    /// Create a new chmod resource.
    #[must_use]
    pub const fn new(target: PathBuf, mode: u32) -> Self {
        Self { target, mode }
    }

    /// Create from an octal mode string such as `"600"`.
    ///
    /// # Errors
    ///
    /// Returns an error if `mode` is not an octal permission value.
    pub fn from_octal(target: PathBuf, mode: &str) -> Result<Self> {
        let bits = u32::from_str_radix(mode, 8)
            .with_context(|| format!("invalid octal mode: {mode}"))?;
        if bits > 0o7777 {
            anyhow::bail!("invalid octal mode: {mode}");
        }
        Ok(Self::new(target, bits))
    }
}

impl Applicable for ChmodResource {
    fn description(&self) -> String {
        format!("chmod {:o} {}", self.mode, self.target.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            std::fs::set_permissions(&self.target, std::fs::Permissions::from_mode(self.mode))
                .with_context(|| format!("set permissions: {}", self.target.display()))?;
            Ok(ResourceChange::Applied)
        }

        #[cfg(not(unix))]
        {
            Ok(ResourceChange::Skipped {
                reason: "chmod not supported on this platform".to_string(),
            })
        }
    }
}

impl Resource for ChmodResource {
    fn current_state(&self) -> Result<ResourceState> {
        if !self.target.exists() {
            return Ok(ResourceState::Invalid {
                reason: format!("target does not exist: {}", self.target.display()),
            });
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let current_mode = std::fs::metadata(&self.target)
                .with_context(|| format!("reading metadata: {}", self.target.display()))?
                .permissions()
                .mode()
                & 0o7777;

            if current_mode == self.mode {
                Ok(ResourceState::Correct)
            } else {
                Ok(ResourceState::Incorrect {
                    current: format!("{current_mode:o}"),
                })
            }
        }

        #[cfg(not(unix))]
        {
            Ok(ResourceState::Invalid {
                reason: "chmod not supported on this platform".to_string(),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn description_uses_octal() {
        let resource = ChmodResource::new(PathBuf::from("/home/u/.ssh/authorized_keys"), 0o640);
        assert_eq!(resource.description(), "chmod 640 /home/u/.ssh/authorized_keys");
    }

    #[test]
    fn from_octal_rejects_garbage() {
        assert!(ChmodResource::from_octal(PathBuf::from("/x"), "9z").is_err());
        assert!(ChmodResource::from_octal(PathBuf::from("/x"), "77777").is_err());
        assert_eq!(
            ChmodResource::from_octal(PathBuf::from("/x"), "700").unwrap().mode,
            0o700
        );
    }

    #[test]
    fn invalid_when_target_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let resource = ChmodResource::new(temp_dir.path().join("nonexistent"), 0o600);
        assert!(matches!(
            resource.current_state().unwrap(),
            ResourceState::Invalid { .. }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn detects_and_fixes_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("keys");
        std::fs::write(&file, "test").unwrap();
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o644)).unwrap();

        let resource = ChmodResource::new(file.clone(), 0o640);
        assert_eq!(
            resource.current_state().unwrap(),
            ResourceState::Incorrect {
                current: "644".to_string()
            }
        );
        assert_eq!(resource.apply().unwrap(), ResourceChange::Applied);
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
        let mode = std::fs::metadata(&file).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o640);
    }
}
