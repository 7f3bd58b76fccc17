//! Per-script version store.
//!
//! Each script records the last update it applied in
//! `<store_dir>/.config_version`:
//!
//! ```text
//! [Current Version Info]
//! updatedToVersion = 12
//! ```
//!
//! The file is meant to be edited by hand for manual recovery, so reading is
//! lenient (key case is ignored, other sections are kept). A missing file
//! reads as version 0; an unusable one is reported to the caller, which logs
//! it and starts from 0.
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use crate::config::ini::{KvSection, parse_kv_sections_from_str, render_kv_sections};
use crate::config::scripts::ScriptDescriptor;
use crate::error::StoreError;

/// Name of the version file inside a script's store directory.
pub const VERSION_FILE_NAME: &str = ".config_version";

/// Section holding the version.
pub const VERSION_SECTION: &str = "Current Version Info";

/// Key holding the last applied update number.
pub const VERSION_KEY: &str = "updatedToVersion";

/// Progress of one script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    /// Script the record belongs to.
    pub script: String,
    /// Highest update number that was applied or skipped; 0 if never run.
    pub last_applied: u32,
}

impl VersionRecord {
    /// A record for a script that never ran.
    #[must_use]
    pub fn new(script: impl Into<String>) -> Self {
        Self::at(script, 0)
    }

    /// A record at `version`.
    #[must_use]
    pub fn at(script: impl Into<String>, version: u32) -> Self {
        Self {
            script: script.into(),
            last_applied: version,
        }
    }
}

/// Storage for [`VersionRecord`]s.
#[cfg_attr(test, mockall::automock)]
pub trait VersionStore {
    /// Load the record for `script`; a script that never ran is at 0.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a record exists but cannot be read or holds
    /// no usable version.
    fn load(&self, script: &ScriptDescriptor) -> Result<VersionRecord, StoreError>;

    /// Persist `record` for `script`, replacing the previous one atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the record cannot be written.
    fn save(&self, script: &ScriptDescriptor, record: &VersionRecord) -> Result<(), StoreError>;
}

/// [`VersionStore`] keeping one `.config_version` file per store directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileVersionStore;

impl FileVersionStore {
    /// Path of the version file for `script`.
    #[must_use]
    pub fn path_for(script: &ScriptDescriptor) -> PathBuf {
        script.store_dir.join(VERSION_FILE_NAME)
    }
}

impl VersionStore for FileVersionStore {
    fn load(&self, script: &ScriptDescriptor) -> Result<VersionRecord, StoreError> {
        let version = read_version(&Self::path_for(script))?;
        Ok(VersionRecord::at(&script.name, version.unwrap_or(0)))
    }

    fn save(&self, script: &ScriptDescriptor, record: &VersionRecord) -> Result<(), StoreError> {
        write_version(&Self::path_for(script), record.last_applied)
    }
}

/// Read the version stored at `path`.
///
/// Returns `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if the file exists but cannot be read and
/// [`StoreError::Corrupt`] if it holds no usable version.
pub fn read_version(path: &Path) -> Result<Option<u32>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let corrupt = |message: String| StoreError::Corrupt {
        path: path.to_path_buf(),
        message,
    };
    let sections = parse_kv_sections_from_str(&content).map_err(|e| corrupt(e.to_string()))?;
    let section = sections
        .iter()
        .find(|s| s.header.eq_ignore_ascii_case(VERSION_SECTION))
        .ok_or_else(|| corrupt(format!("missing [{VERSION_SECTION}] section")))?;
    let raw = section
        .entries
        .iter()
        .rev()
        .find(|(k, _)| k.eq_ignore_ascii_case(VERSION_KEY))
        .map(|(_, v)| v.as_str())
        .ok_or_else(|| corrupt(format!("missing {VERSION_KEY}")))?;
    raw.parse::<u32>()
        .map(Some)
        .map_err(|e| corrupt(format!("invalid {VERSION_KEY} '{raw}': {e}")))
}

/// Write `version` to `path` atomically (temp file in the same directory,
/// then rename). Other sections of an existing, readable file are kept.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if the directory or file cannot be written.
pub fn write_version(path: &Path, version: u32) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let io_err = |source: io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    fs::create_dir_all(dir).map_err(io_err)?;

    let mut sections: Vec<KvSection> = fs::read_to_string(path)
        .ok()
        .and_then(|c| parse_kv_sections_from_str(&c).ok())
        .unwrap_or_default()
        .into_iter()
        .filter(|s| !s.header.eq_ignore_ascii_case(VERSION_SECTION))
        .collect();
    let mut current = KvSection::new(VERSION_SECTION);
    current.set(VERSION_KEY, version.to_string());
    sections.insert(0, current);

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(render_kv_sections(&sections).as_bytes())
        .map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn descriptor(dir: &Path) -> ScriptDescriptor {
        ScriptDescriptor {
            name: "home".to_string(),
            implementation: "home".to_string(),
            store_dir: dir.to_path_buf(),
            description: String::new(),
            root_required: false,
        }
    }

    #[test]
    fn missing_file_loads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let record = FileVersionStore.load(&descriptor(dir.path())).unwrap();
        assert_eq!(record, VersionRecord::new("home"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let d = descriptor(&dir.path().join("not/yet/created"));
        FileVersionStore.save(&d, &VersionRecord::at("home", 7)).unwrap();
        assert_eq!(FileVersionStore.load(&d).unwrap().last_applied, 7);
        let text = fs::read_to_string(FileVersionStore::path_for(&d)).unwrap();
        insta::assert_snapshot!(text, @r"
        [Current Version Info]
        updatedToVersion = 7
        ");
    }

    #[test]
    fn save_replaces_previous_value_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let d = descriptor(dir.path());
        FileVersionStore.save(&d, &VersionRecord::at("home", 3)).unwrap();
        FileVersionStore.save(&d, &VersionRecord::at("home", 2)).unwrap();
        assert_eq!(FileVersionStore.load(&d).unwrap().last_applied, 2);
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec![VERSION_FILE_NAME.to_string()]);
    }

    #[test]
    fn lowercase_key_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(VERSION_FILE_NAME);
        fs::write(&path, "[Current Version Info]\nupdatedtoversion = 12\n").unwrap();
        assert_eq!(read_version(&path).unwrap(), Some(12));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let d = descriptor(dir.path());
        let path = FileVersionStore::path_for(&d);
        for bad in [
            "garbage without section\n",
            "[Other]\nx = 1\n",
            "[Current Version Info]\nupdatedToVersion = -3\n",
            "[Current Version Info]\nupdatedToVersion = many\n",
        ] {
            fs::write(&path, bad).unwrap();
            assert!(
                matches!(FileVersionStore.load(&d), Err(StoreError::Corrupt { .. })),
                "expected corrupt for {bad:?}"
            );
        }
    }

    #[test]
    fn unreadable_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let d = descriptor(dir.path());
        // A directory where the file should be cannot be read as text.
        fs::create_dir(FileVersionStore::path_for(&d)).unwrap();
        assert!(matches!(
            FileVersionStore.load(&d),
            Err(StoreError::Io { .. })
        ));
    }

    #[test]
    fn save_keeps_unrelated_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(VERSION_FILE_NAME);
        fs::write(
            &path,
            "[Current Version Info]\nupdatedToVersion = 1\n\n[Notes]\nowner = jane\n",
        )
        .unwrap();
        write_version(&path, 2).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "[Current Version Info]\nupdatedToVersion = 2\n\n[Notes]\nowner = jane\n"
        );
    }

    #[test]
    fn save_into_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();
        let d = descriptor(&blocker.join("store"));
        let err = FileVersionStore
            .save(&d, &VersionRecord::at("home", 1))
            .unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
