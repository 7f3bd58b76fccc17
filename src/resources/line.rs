//! Line-in-file resource.
use anyhow::{Context as _, Result};
use std::io::Write as _;
use std::path::PathBuf;

use super::{Applicable, Resource, ResourceChange, ResourceState};

/// A line that must be present in a text file.
///
/// Applying appends the line (creating the file if needed); lines already
/// in the file are never rewritten.
#[derive(Debug, Clone)]
pub struct LineInFileResource {
    /// File to edit.
    pub file: PathBuf,
    /// The exact line, without trailing newline.
    pub line: String,
}

impl LineInFileResource {
    /// Create a new line-in-file resource.
    #[must_use]
    pub fn new(file: PathBuf, line: impl Into<String>) -> Self {
        Self {
            file,
            line: line.into(),
        }
    }
}

impl Applicable for LineInFileResource {
    fn description(&self) -> String {
        format!("{} += {}", self.file.display(), self.line)
    }

    fn apply(&self) -> Result<ResourceChange> {
        super::helpers::fs::ensure_parent_dir(&self.file)?;
        let existing = match std::fs::read_to_string(&self.file) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.file.display()));
            }
        };

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)
            .with_context(|| format!("opening {}", self.file.display()))?;
        let mut text = String::new();
        if !existing.is_empty() && !existing.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&self.line);
        text.push('\n');
        file.write_all(text.as_bytes())
            .with_context(|| format!("appending to {}", self.file.display()))?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for LineInFileResource {
    fn current_state(&self) -> Result<ResourceState> {
        if super::helpers::fs::is_real_dir(&self.file) {
            return Ok(ResourceState::Invalid {
                reason: "target is a directory".to_string(),
            });
        }
        match std::fs::read_to_string(&self.file) {
            Ok(contents) => {
                if contents.lines().any(|l| l.trim_end() == self.line) {
                    Ok(ResourceState::Correct)
                } else {
                    Ok(ResourceState::Incorrect {
                        current: "line absent".to_string(),
                    })
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ResourceState::Missing),
            Err(e) => Err(e).with_context(|| format!("reading {}", self.file.display())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join(".bashrc");
        let resource = LineInFileResource::new(file.clone(), "source ~/.my_bashrc");
        assert_eq!(resource.current_state().unwrap(), ResourceState::Missing);
        resource.apply().unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "source ~/.my_bashrc\n");
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn appends_after_unterminated_last_line() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join(".bashrc");
        std::fs::write(&file, "alias ll='ls -l'").unwrap();
        let resource = LineInFileResource::new(file.clone(), "export EDITOR=vim");
        assert!(resource.needs_change().unwrap());
        resource.apply().unwrap();
        assert_eq!(
            std::fs::read_to_string(&file).unwrap(),
            "alias ll='ls -l'\nexport EDITOR=vim\n"
        );
    }

    #[test]
    fn present_line_is_correct() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join(".bashrc");
        std::fs::write(&file, "a\nexport EDITOR=vim  \nb\n").unwrap();
        let resource = LineInFileResource::new(file, "export EDITOR=vim");
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn directory_target_is_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        let resource = LineInFileResource::new(tmp.path().to_path_buf(), "x");
        assert!(matches!(
            resource.current_state().unwrap(),
            ResourceState::Invalid { .. }
        ));
    }
}
