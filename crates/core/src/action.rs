//! Reversible action records.
//!
//! One record is produced for every successful destructive file operation.
//! It holds exactly what undo needs to put the file back.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionRecord {
    /// `prior_content` is `None` when the write created the file.
    WriteFile {
        path: PathBuf,
        prior_content: Option<String>,
    },
    DeleteFile {
        path: PathBuf,
        prior_content: Option<String>,
    },
    ClearFileContent {
        path: PathBuf,
        prior_content: Option<String>,
    },
    /// `offset` is the byte position where `new_code` was spliced in.
    ApplyCodeChange {
        path: PathBuf,
        offset: usize,
        old_code: String,
        new_code: String,
    },
}

impl ActionRecord {
    /// Name of the tool that produced this record.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WriteFile { .. } => "write_file",
            Self::DeleteFile { .. } => "delete_file",
            Self::ClearFileContent { .. } => "clear_file_content",
            Self::ApplyCodeChange { .. } => "apply_code_change",
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::WriteFile { path, .. }
            | Self::DeleteFile { path, .. }
            | Self::ClearFileContent { path, .. }
            | Self::ApplyCodeChange { path, .. } => path,
        }
    }
}
