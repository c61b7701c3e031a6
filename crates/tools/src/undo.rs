//! Undo: reverse the most recent destructive file operation.

use async_trait::async_trait;
use codewright_core::action::ActionRecord;
use codewright_core::error::ToolError;
use codewright_core::tool::{FileEffect, Tool, ToolOutput};
use codewright_memory::SharedMemory;
use tracing::info;

use crate::action_log::{self, SharedActionLog};

/// Put the file named by `record` back the way it was.
///
/// Returns a message for the reasoner and the file's restored state.
pub async fn revert(record: &ActionRecord) -> Result<(String, FileEffect), ToolError> {
    let path = record.path();
    let shown = path.display();
    let io_failure =
        |e: std::io::Error| ToolError::Undo(format!("Error undoing action {} on {shown}: {e}", record.kind()));

    match record {
        ActionRecord::WriteFile { prior_content: None, .. } => {
            tokio::fs::remove_file(path).await.map_err(io_failure)?;
            Ok((format!("Removed newly created file: {shown}"), FileEffect::Removed))
        }
        ActionRecord::WriteFile {
            prior_content: Some(prior),
            ..
        } => {
            tokio::fs::write(path, prior).await.map_err(io_failure)?;
            Ok((
                format!("Restored {shown} to its previous content."),
                FileEffect::Contents(prior.clone()),
            ))
        }
        ActionRecord::DeleteFile { prior_content, .. } => {
            let prior = prior_content.as_ref().ok_or_else(|| {
                ToolError::Undo(format!("Could not restore deleted file {shown}: No original content found."))
            })?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(io_failure)?;
            }
            tokio::fs::write(path, prior).await.map_err(io_failure)?;
            Ok((format!("Restored deleted file: {shown}"), FileEffect::Contents(prior.clone())))
        }
        ActionRecord::ClearFileContent { prior_content, .. } => {
            let prior = prior_content.as_ref().ok_or_else(|| {
                ToolError::Undo(format!("Could not restore content of {shown}: No original content found."))
            })?;
            tokio::fs::write(path, prior).await.map_err(io_failure)?;
            Ok((format!("Restored content of {shown}."), FileEffect::Contents(prior.clone())))
        }
        ActionRecord::ApplyCodeChange {
            offset,
            old_code,
            new_code,
            ..
        } => {
            let mismatch = || {
                ToolError::Undo(format!(
                    "Could not undo code change in {shown}: Current content does not match expected state for undo."
                ))
            };
            let current = tokio::fs::read_to_string(path).await.map_err(|_| mismatch())?;
            let end = offset + new_code.len();
            if current.get(*offset..end) != Some(new_code.as_str()) {
                return Err(mismatch());
            }
            let restored = format!("{}{old_code}{}", &current[..*offset], &current[end..]);
            tokio::fs::write(path, &restored).await.map_err(io_failure)?;
            Ok((format!("Undid code change in {shown}."), FileEffect::Contents(restored)))
        }
    }
}

/// `undo_last_action`: pops the action log and reverts the record.
pub struct UndoTool {
    log: SharedActionLog,
    memory: SharedMemory,
}

impl UndoTool {
    pub fn new(log: SharedActionLog, memory: SharedMemory) -> Self {
        Self { log, memory }
    }
}

#[async_trait]
impl Tool for UndoTool {
    fn name(&self) -> &str {
        "undo_last_action"
    }

    fn description(&self) -> &str {
        "Undoes the most recent file modification (write, delete, clear or code change)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let record = action_log::lock(&self.log)
            .pop()
            .ok_or_else(|| ToolError::Undo("No actions to undo.".into()))?;

        let result = revert(&record).await;

        let mut memory = self.memory.lock().await;
        match &result {
            Ok((_, FileEffect::Contents(content))) => {
                memory.cache_file_content(record.path(), content);
            }
            Ok((_, FileEffect::Removed)) => memory.forget_file(record.path()),
            Err(_) => {}
        }
        let error = result.as_ref().err().map(ToolError::message);
        memory.record_file_operation(record.path(), self.name(), result.is_ok(), error.as_deref());
        drop(memory);

        let (message, _) = result?;
        info!(kind = record.kind(), path = %record.path().display(), "Action undone");
        Ok(ToolOutput::text(message))
    }
}
