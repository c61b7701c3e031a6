//! Timestamped file backups taken before destructive operations.

use chrono::Local;
use codewright_core::error::ToolError;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Copy `path` into `backup_dir` as `<flattened path>.<timestamp>.bak`.
///
/// Nothing is copied when `path` does not exist yet.
pub fn backup_file(path: &Path, root: &Path, backup_dir: &Path) -> Result<Option<PathBuf>, ToolError> {
    if !path.is_file() {
        return Ok(None);
    }

    let fail = |reason: String| ToolError::BackupFailed {
        path: path.display().to_string(),
        reason,
    };

    std::fs::create_dir_all(backup_dir).map_err(|e| fail(e.to_string()))?;

    let stamp = Local::now().format("%Y%m%d_%H%M%S_%3f");
    let target = backup_dir.join(format!("{}.{stamp}.bak", flatten(path, root)));
    std::fs::copy(path, &target).map_err(|e| fail(e.to_string()))?;

    debug!(path = %path.display(), backup = %target.display(), "Backup created");
    Ok(Some(target))
}

/// `src/pkg/mod.py` → `src_pkg_mod.py`
fn flatten(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("_")
}
