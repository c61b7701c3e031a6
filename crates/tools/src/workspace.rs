//! The project a tool set operates on.
//!
//! Relative paths handed to tools resolve against the project root, and
//! destructive file operations back up their target first.

use codewright_config::ToolsConfig;
use codewright_core::error::ToolError;
use std::path::{Path, PathBuf};

use crate::backup;

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    backup_dir: Option<PathBuf>,
}

impl Workspace {
    /// A workspace rooted at `root` with backups disabled.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            backup_dir: None,
        }
    }

    pub fn from_config(root: impl Into<PathBuf>, config: &ToolsConfig) -> Self {
        let root = root.into();
        let backup_dir = config.backup_path(&root);
        Self { root, backup_dir }
    }

    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(dir.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn backup_dir(&self) -> Option<&Path> {
        self.backup_dir.as_deref()
    }

    /// Absolute paths pass through; relative ones join the project root.
    pub fn resolve(&self, filepath: &str) -> PathBuf {
        let path = Path::new(filepath);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Copy `path` aside before it is mutated.
    ///
    /// Returns the backup location, or `None` when backups are off or there
    /// is nothing on disk yet.
    pub fn backup(&self, path: &Path) -> Result<Option<PathBuf>, ToolError> {
        match &self.backup_dir {
            Some(dir) => backup::backup_file(path, &self.root, dir),
            None => Ok(None),
        }
    }
}

/// Pull a required string argument out of a tool call.
pub(crate) fn required_str<'a>(arguments: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolError> {
    arguments[key]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

/// An optional, non-empty string argument.
pub(crate) fn optional_str<'a>(arguments: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    arguments[key].as_str().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_root() {
        let workspace = Workspace::new("/project");
        assert_eq!(workspace.resolve("src/main.py"), PathBuf::from("/project/src/main.py"));
        assert_eq!(workspace.resolve("/etc/hosts"), PathBuf::from("/etc/hosts"));
    }

    #[test]
    fn backups_follow_config() {
        let enabled = Workspace::from_config("/project", &ToolsConfig::default());
        assert_eq!(enabled.backup_dir(), Some(Path::new("/project/.codewright/backups")));

        let config = ToolsConfig {
            backups: false,
            ..ToolsConfig::default()
        };
        assert!(Workspace::from_config("/project", &config).backup_dir().is_none());
    }

    #[test]
    fn argument_helpers() {
        let args = serde_json::json!({ "filepath": "a.py", "empty": "" });
        assert_eq!(required_str(&args, "filepath").unwrap(), "a.py");
        assert!(matches!(
            required_str(&args, "content"),
            Err(ToolError::InvalidArguments(msg)) if msg == "Missing 'content' argument"
        ));
        assert_eq!(optional_str(&args, "empty"), None);
    }
}
