//! File-system resource helpers.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use crate::error::StepError;

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns [`StepError::Setup`] if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<(), StepError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| StepError::Setup {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// `path` with `suffix` appended to its file name (`a.json` + `.bak` gives
/// `a.json.bak`).
#[must_use]
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Copy an existing file aside as `<path><suffix>`, overwriting any older
/// copy. Returns the backup path, or `None` if `path` does not exist.
///
/// # Errors
///
/// Returns an error if the copy fails.
pub fn backup_copy(path: &Path, suffix: &str) -> Result<Option<PathBuf>> {
    if !path.is_file() {
        return Ok(None);
    }
    let backup = with_suffix(path, suffix);
    std::fs::copy(path, &backup)
        .with_context(|| format!("backup {} to {}", path.display(), backup.display()))?;
    Ok(Some(backup))
}

/// Write `content` to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ensure_parent_dir_creates_ancestors() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("a/b/c.txt");
        ensure_parent_dir(&target).unwrap();
        assert!(tmp.path().join("a/b").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn ensure_parent_dir_reports_setup_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let err = ensure_parent_dir(&blocker.join("sub/c.txt")).unwrap_err();
        assert!(matches!(err, StepError::Setup { .. }));
    }

    #[test]
    fn with_suffix_appends_to_file_name() {
        assert_eq!(
            with_suffix(Path::new("/h/.cursor/mcp.json"), ".corrupt.bak"),
            PathBuf::from("/h/.cursor/mcp.json.corrupt.bak")
        );
    }

    #[test]
    fn backup_copy_missing_file_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(backup_copy(&tmp.path().join("nope"), ".bak").unwrap(), None);
    }

    #[test]
    fn backup_copy_overwrites_previous_backup() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join(".npmrc");
        std::fs::write(&file, "first").unwrap();
        backup_copy(&file, ".bak").unwrap();
        std::fs::write(&file, "second").unwrap();
        let backup = backup_copy(&file, ".bak").unwrap().unwrap();
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "second");
    }
}
