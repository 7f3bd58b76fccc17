//! Link resource: a file placed at a target path from a source.
use anyhow::{Context as _, Result};
use std::fmt;
use std::path::{Path, PathBuf};

use super::helpers::fs::{
    copy_dir_recursive, ensure_parent_dir, is_real_dir, remove_existing, same_contents, same_inode,
};
use super::{Applicable, Resource, ResourceChange, ResourceState};

/// How the target is tied to its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Symbolic link pointing at the source.
    Symbolic,
    /// Hard link sharing the source's inode.
    Hard,
    /// Independent copy of the source.
    Copy,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symbolic => f.write_str("->"),
            Self::Hard => f.write_str("=>"),
            Self::Copy => f.write_str("<="),
        }
    }
}

/// A link resource that can be checked and applied.
///
/// Applying replaces whatever file or link sits at the target. A real
/// directory at the target is never removed.
#[derive(Debug, Clone)]
pub struct LinkResource {
    /// The source file/directory.
    pub source: PathBuf,
    /// The target path (where the link will be created).
    pub target: PathBuf,
    /// Link flavour.
    pub kind: LinkKind,
}

impl LinkResource {
    /// Create a new link resource.
    #[must_use]
    pub const fn new(source: PathBuf, target: PathBuf, kind: LinkKind) -> Self {
        Self {
            source,
            target,
            kind,
        }
    }

    /// A symbolic link at `target` pointing to `source`.
    #[must_use]
    pub const fn symlink(source: PathBuf, target: PathBuf) -> Self {
        Self::new(source, target, LinkKind::Symbolic)
    }

    /// A hard link at `target` to `source`.
    #[must_use]
    pub const fn hard(source: PathBuf, target: PathBuf) -> Self {
        Self::new(source, target, LinkKind::Hard)
    }

    /// A copy of `source` at `target`.
    #[must_use]
    pub const fn copy(source: PathBuf, target: PathBuf) -> Self {
        Self::new(source, target, LinkKind::Copy)
    }

    fn symlink_state(&self) -> ResourceState {
        std::fs::read_link(&self.target).map_or_else(
            |_| {
                if self.target.symlink_metadata().is_ok() {
                    ResourceState::Incorrect {
                        current: "target is a regular file".to_string(),
                    }
                } else {
                    ResourceState::Missing
                }
            },
            |existing| {
                if existing == self.source {
                    ResourceState::Correct
                } else {
                    ResourceState::Incorrect {
                        current: format!("points to {}", existing.display()),
                    }
                }
            },
        )
    }

    fn hard_state(&self) -> ResourceState {
        if self.target.symlink_metadata().is_err() {
            ResourceState::Missing
        } else if same_inode(&self.source, &self.target) {
            ResourceState::Correct
        } else {
            ResourceState::Incorrect {
                current: "target is a different file".to_string(),
            }
        }
    }

    fn copy_state(&self) -> Result<ResourceState> {
        let Ok(meta) = self.target.symlink_metadata() else {
            return Ok(ResourceState::Missing);
        };
        if meta.is_symlink() {
            return Ok(ResourceState::Incorrect {
                current: "target is a symlink".to_string(),
            });
        }
        if self.source.is_dir() {
            // Directory copies are refreshed on every apply.
            return Ok(ResourceState::Incorrect {
                current: "directory copy".to_string(),
            });
        }
        if same_contents(&self.source, &self.target)? {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: "contents differ".to_string(),
            })
        }
    }
}

impl Applicable for LinkResource {
    fn description(&self) -> String {
        format!(
            "{} {} {}",
            self.target.display(),
            self.kind,
            self.source.display()
        )
    }

    fn apply(&self) -> Result<ResourceChange> {
        ensure_parent_dir(&self.target)?;

        if self.kind == LinkKind::Copy && self.source.is_dir() {
            if !is_real_dir(&self.target) {
                remove_existing(&self.target)?;
            }
            copy_dir_recursive(&self.source, &self.target)?;
            return Ok(ResourceChange::Applied);
        }

        remove_existing(&self.target)?;
        match self.kind {
            LinkKind::Symbolic => create_symlink(&self.source, &self.target)?,
            LinkKind::Hard => {
                std::fs::hard_link(&self.source, &self.target).with_context(|| {
                    format!(
                        "creating hard link {} => {}",
                        self.target.display(),
                        self.source.display()
                    )
                })?;
            }
            LinkKind::Copy => {
                std::fs::copy(&self.source, &self.target).with_context(|| {
                    format!(
                        "copying {} to {}",
                        self.source.display(),
                        self.target.display()
                    )
                })?;
            }
        }
        Ok(ResourceChange::Applied)
    }
}

impl Resource for LinkResource {
    fn current_state(&self) -> Result<ResourceState> {
        if !self.source.exists() {
            return Ok(ResourceState::Invalid {
                reason: format!("source does not exist: {}", self.source.display()),
            });
        }
        if self.kind == LinkKind::Hard && self.source.is_dir() {
            return Ok(ResourceState::Invalid {
                reason: "cannot hard-link a directory".to_string(),
            });
        }
        let dir_copy = self.kind == LinkKind::Copy && self.source.is_dir();
        if is_real_dir(&self.target) && !dir_copy {
            return Ok(ResourceState::Invalid {
                reason: "target is a real directory".to_string(),
            });
        }

        match self.kind {
            LinkKind::Symbolic => Ok(self.symlink_state()),
            LinkKind::Hard => Ok(self.hard_state()),
            LinkKind::Copy => self.copy_state(),
        }
    }
}

/// Create a symlink at `link` pointing to `target`.
#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link).with_context(|| {
        format!(
            "creating symlink {} -> {}",
            link.display(),
            target.display()
        )
    })
}

#[cfg(not(unix))]
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    anyhow::bail!(
        "symbolic links are not supported on this platform: {} -> {}",
        link.display(),
        target.display()
    )
}
