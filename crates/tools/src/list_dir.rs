//! `list_directory_contents`: list a project directory.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{Tool, ToolOutput};
use std::sync::Arc;

use crate::workspace::{Workspace, optional_str};

/// Dot-entries and virtualenvs are noise for the reasoner.
fn is_hidden(name: &str) -> bool {
    name.starts_with('.') || name.starts_with("venv")
}

pub struct ListDirectoryTool {
    workspace: Arc<Workspace>,
}

impl ListDirectoryTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory_contents"
    }

    fn description(&self) -> &str {
        "Lists the files and directories in a directory (the project root by default)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "directory_path": {
                    "type": "string",
                    "description": "Optional directory to list."
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let dir = match optional_str(&arguments, "directory_path") {
            Some(path) => self.workspace.resolve(path),
            None => self.workspace.root().to_path_buf(),
        };

        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| ToolError::failed(self.name(), e.to_string()))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ToolError::failed(self.name(), e.to_string()))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_hidden(&name) {
                names.push(name);
            }
        }
        names.sort();

        Ok(ToolOutput::text(names.join("\n")))
    }
}
