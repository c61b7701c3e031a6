//! Destructive whole-file tools: `write_file`, `delete_file` and
//! `clear_file_content`.
//!
//! Each one snapshots the prior content for undo and backs the file up
//! before touching it.

use async_trait::async_trait;
use codewright_core::action::ActionRecord;
use codewright_core::approval::{Preview, PreviewKind};
use codewright_core::error::ToolError;
use codewright_core::tool::{FileEffect, Tool, ToolOutput};
use std::path::Path;
use std::sync::Arc;

use crate::workspace::{Workspace, required_str};

/// Content of `path` before a mutation, `None` if it does not exist.
pub(crate) async fn prior_content(tool_name: &str, path: &Path) -> Result<Option<String>, ToolError> {
    if !path.exists() {
        return Ok(None);
    }
    tokio::fs::read_to_string(path)
        .await
        .map(Some)
        .map_err(|e| ToolError::failed(tool_name, format!("Cannot snapshot {}: {e}", path.display())))
}

fn filepath_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "filepath": { "type": "string", "description": description }
        },
        "required": ["filepath"]
    })
}

// ── write_file ────────────────────────────────────────────────────────────

pub struct WriteFileTool {
    workspace: Arc<Workspace>,
}

impl WriteFileTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Writes content to a specified file. Creates the file if it doesn't exist, overwrites it if it does."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filepath": {
                    "type": "string",
                    "description": "The path to the file to write."
                },
                "content": {
                    "type": "string",
                    "description": "The content to write to the file."
                }
            },
            "required": ["filepath", "content"]
        })
    }

    fn touches_file(&self) -> bool {
        true
    }

    fn preview(&self, arguments: &serde_json::Value) -> Option<Preview> {
        let content = arguments["content"].as_str()?;
        Some(Preview::new(content, PreviewKind::Text))
    }

    async fn snapshot(&self, arguments: &serde_json::Value) -> Result<Option<ActionRecord>, ToolError> {
        let path = self.workspace.resolve(required_str(arguments, "filepath")?);
        let prior_content = prior_content(self.name(), &path).await?;
        Ok(Some(ActionRecord::WriteFile { path, prior_content }))
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let filepath = required_str(&arguments, "filepath")?;
        let content = required_str(&arguments, "content")?;
        let path = self.workspace.resolve(filepath);

        self.workspace.backup(&path)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::failed(self.name(), format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, content)
            .await
            .map_err(|e| ToolError::failed(self.name(), e.to_string()))?;

        Ok(ToolOutput::with_file(
            format!("File {filepath} written successfully."),
            FileEffect::Contents(content.to_string()),
        ))
    }
}

// ── delete_file ───────────────────────────────────────────────────────────

pub struct DeleteFileTool {
    workspace: Arc<Workspace>,
}

impl DeleteFileTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &str {
        "delete_file"
    }

    fn description(&self) -> &str {
        "Deletes a specified file."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        filepath_schema("The path to the file to delete.")
    }

    fn touches_file(&self) -> bool {
        true
    }

    async fn snapshot(&self, arguments: &serde_json::Value) -> Result<Option<ActionRecord>, ToolError> {
        let path = self.workspace.resolve(required_str(arguments, "filepath")?);
        let prior_content = prior_content(self.name(), &path).await?;
        Ok(Some(ActionRecord::DeleteFile { path, prior_content }))
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let filepath = required_str(&arguments, "filepath")?;
        let path = self.workspace.resolve(filepath);

        if !path.is_file() {
            return Err(ToolError::failed(self.name(), format!("File not found: {filepath}")));
        }

        self.workspace.backup(&path)?;

        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| ToolError::failed(self.name(), e.to_string()))?;

        Ok(ToolOutput::with_file(
            format!("File {filepath} deleted successfully."),
            FileEffect::Removed,
        ))
    }
}

// ── clear_file_content ────────────────────────────────────────────────────

pub struct ClearFileContentTool {
    workspace: Arc<Workspace>,
}

impl ClearFileContentTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ClearFileContentTool {
    fn name(&self) -> &str {
        "clear_file_content"
    }

    fn description(&self) -> &str {
        "Clears all content from a specified file, leaving it empty."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        filepath_schema("The path to the file to clear.")
    }

    fn touches_file(&self) -> bool {
        true
    }

    async fn snapshot(&self, arguments: &serde_json::Value) -> Result<Option<ActionRecord>, ToolError> {
        let path = self.workspace.resolve(required_str(arguments, "filepath")?);
        let prior_content = prior_content(self.name(), &path).await?;
        Ok(Some(ActionRecord::ClearFileContent { path, prior_content }))
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let filepath = required_str(&arguments, "filepath")?;
        let path = self.workspace.resolve(filepath);

        if !path.is_file() {
            return Err(ToolError::failed(self.name(), format!("File not found: {filepath}")));
        }

        self.workspace.backup(&path)?;

        tokio::fs::write(&path, "")
            .await
            .map_err(|e| ToolError::failed(self.name(), e.to_string()))?;

        Ok(ToolOutput::with_file(
            format!("Content of {filepath} cleared successfully."),
            FileEffect::Contents(String::new()),
        ))
    }
}
