//! File-system resource helpers.
use anyhow::{Context as _, Result};
use std::path::Path;

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create parent: {}", parent.display()))?;
    }
    Ok(())
}

/// Remove an existing file or symlink at `path`, including broken symlinks.
///
/// Does nothing if `path` does not exist. Real directories are left alone
/// and reported as an error.
///
/// # Errors
///
/// Returns an error if the path exists but cannot be removed.
pub fn remove_existing(path: &Path) -> Result<()> {
    let Ok(meta) = path.symlink_metadata() else {
        return Ok(());
    };
    if meta.is_dir() {
        anyhow::bail!("refusing to remove directory: {}", path.display());
    }
    std::fs::remove_file(path).with_context(|| format!("remove existing: {}", path.display()))
}

/// Whether `path` is a real directory (not a symlink to one).
#[must_use]
pub fn is_real_dir(path: &Path) -> bool {
    path.symlink_metadata().is_ok_and(|m| m.is_dir())
}

/// Recursively copy a directory tree.
///
/// Symlinks within the source tree are *followed*: their contents are
/// materialised rather than copying the link itself.
///
/// # Errors
///
/// Returns an error if the destination directory cannot be created, a source
/// entry cannot be read, or a file cannot be copied.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)
        .with_context(|| format!("creating directory {}", dst.display()))?;
    for entry in
        std::fs::read_dir(src).with_context(|| format!("reading directory {}", src.display()))?
    {
        let entry = entry.with_context(|| format!("reading entry in {}", src.display()))?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path).with_context(|| {
                format!("copying {} to {}", src_path.display(), dst_path.display())
            })?;
        }
    }
    Ok(())
}

/// Whether two regular files have identical contents.
///
/// # Errors
///
/// Returns an error if either file cannot be read.
pub fn same_contents(a: &Path, b: &Path) -> Result<bool> {
    let left = std::fs::metadata(a).with_context(|| format!("reading metadata: {}", a.display()))?;
    let right = std::fs::metadata(b).with_context(|| format!("reading metadata: {}", b.display()))?;
    if left.len() != right.len() {
        return Ok(false);
    }
    let left = std::fs::read(a).with_context(|| format!("reading {}", a.display()))?;
    let right = std::fs::read(b).with_context(|| format!("reading {}", b.display()))?;
    Ok(left == right)
}

/// Whether `a` and `b` are hard links to the same inode.
#[cfg(unix)]
#[must_use]
pub fn same_inode(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (a.symlink_metadata(), b.symlink_metadata()) {
        (Ok(x), Ok(y)) => x.dev() == y.dev() && x.ino() == y.ino(),
        _ => false,
    }
}

/// Whether `a` and `b` are hard links to the same file.
#[cfg(not(unix))]
#[must_use]
pub fn same_inode(_a: &Path, _b: &Path) -> bool {
    false
}
