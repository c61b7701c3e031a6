//! `apply_code_change`: replace one fragment of a file.
//!
//! Only the first occurrence of `old_code` is replaced. The snapshot records
//! the byte offset of that occurrence; undo splices `old_code` back at the
//! same offset.

use async_trait::async_trait;
use codewright_core::action::ActionRecord;
use codewright_core::approval::{Preview, PreviewKind};
use codewright_core::error::ToolError;
use codewright_core::tool::{FileEffect, Tool, ToolOutput};
use std::sync::Arc;

use crate::workspace::{Workspace, required_str};

pub struct ApplyCodeChangeTool {
    workspace: Arc<Workspace>,
}

impl ApplyCodeChangeTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

/// Old and new fragments as a minimal line diff.
fn diff_preview(old_code: &str, new_code: &str) -> String {
    let mut out = String::from("--- old\n+++ new\n");
    for line in old_code.lines() {
        out.push_str(&format!("-{line}\n"));
    }
    for line in new_code.lines() {
        out.push_str(&format!("+{line}\n"));
    }
    out
}

#[async_trait]
impl Tool for ApplyCodeChangeTool {
    fn name(&self) -> &str {
        "apply_code_change"
    }

    fn description(&self) -> &str {
        "Applies a specific code change to a file by replacing an old code block with a new one."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filepath": {
                    "type": "string",
                    "description": "The path to the file to modify."
                },
                "old_code": {
                    "type": "string",
                    "description": "The exact block of code to be replaced."
                },
                "new_code": {
                    "type": "string",
                    "description": "The new block of code to insert."
                }
            },
            "required": ["filepath", "old_code", "new_code"]
        })
    }

    fn touches_file(&self) -> bool {
        true
    }

    fn preview(&self, arguments: &serde_json::Value) -> Option<Preview> {
        let old_code = arguments["old_code"].as_str()?;
        let new_code = arguments["new_code"].as_str()?;
        Some(Preview::new(diff_preview(old_code, new_code), PreviewKind::Diff))
    }

    async fn snapshot(&self, arguments: &serde_json::Value) -> Result<Option<ActionRecord>, ToolError> {
        let path = self.workspace.resolve(required_str(arguments, "filepath")?);
        let old_code = required_str(arguments, "old_code")?;
        let new_code = required_str(arguments, "new_code")?;

        // A missing file or fragment fails in execute with its own message.
        let Ok(content) = tokio::fs::read_to_string(&path).await else {
            return Ok(None);
        };
        let offset = match content.find(old_code) {
            Some(offset) if !old_code.is_empty() => offset,
            _ => return Ok(None),
        };

        Ok(Some(ActionRecord::ApplyCodeChange {
            path,
            offset,
            old_code: old_code.to_string(),
            new_code: new_code.to_string(),
        }))
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let filepath = required_str(&arguments, "filepath")?;
        let old_code = required_str(&arguments, "old_code")?;
        let new_code = required_str(&arguments, "new_code")?;
        let path = self.workspace.resolve(filepath);

        if !path.is_file() {
            return Err(ToolError::failed(self.name(), format!("File not found: {filepath}")));
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::failed(self.name(), e.to_string()))?;

        if old_code.is_empty() || !content.contains(old_code) {
            return Err(ToolError::failed(
                self.name(),
                format!("Old code not found in {filepath}. No change applied."),
            ));
        }

        self.workspace.backup(&path)?;

        let updated = content.replacen(old_code, new_code, 1);
        tokio::fs::write(&path, &updated)
            .await
            .map_err(|e| ToolError::failed(self.name(), e.to_string()))?;

        Ok(ToolOutput::with_file(
            format!("Code change applied successfully to {filepath}."),
            FileEffect::Contents(updated),
        ))
    }
}
