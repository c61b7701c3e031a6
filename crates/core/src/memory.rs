//! Memory value types shared between the memory subsystem, the control
//! loop and the reasoner.
//!
//! [`MemoryContext`] is the merged view handed to the reasoner on every
//! iteration. It is rebuilt from scratch each time and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// How a file's content moved between two fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    FileCreated,
    FileCleared,
    ContentAdded,
    ContentRemoved,
    ContentModified,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileCreated => "file_created",
            Self::FileCleared => "file_cleared",
            Self::ContentAdded => "content_added",
            Self::ContentRemoved => "content_removed",
            Self::ContentModified => "content_modified",
        }
    }
}

/// One entry of the working-memory change ring.
///
/// Content changes carry hashes and a `change_type`; tool operation records
/// carry the outcome instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub timestamp: DateTime<Utc>,
    pub filepath: PathBuf,
    pub operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_type: Option<ChangeType>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub timestamp: DateTime<Utc>,
    pub command: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

/// A failed operation remembered against the file it targeted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorState {
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequentFile {
    pub filepath: String,
    pub access_count: u64,
    pub last_accessed: Option<DateTime<Utc>>,
    pub file_type: String,
}

/// Summary of one tool's track record across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolEffectiveness {
    pub total_uses: u64,
    pub successful_uses: u64,
    pub failed_uses: u64,
    pub success_rate: f64,
    pub avg_execution_time_ms: f64,
    /// Most frequent normalized errors, highest count first.
    pub common_errors: Vec<(String, u64)>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryContext {
    pub session_id: String,
    pub working_directory: PathBuf,
    pub active_files: Vec<PathBuf>,
    pub recent_operations: Vec<ChangeRecord>,
    pub recent_commands: Vec<CommandRecord>,
    /// Most recent failure per file.
    pub error_context: BTreeMap<String, ErrorState>,
    pub frequently_accessed_files: Vec<FrequentFile>,
    pub tool_effectiveness: BTreeMap<String, ToolEffectiveness>,
    pub user_preferences: BTreeMap<String, serde_json::Value>,
}
