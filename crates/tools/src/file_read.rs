//! `read_file`: read a project file into the conversation.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{FileEffect, Tool, ToolOutput};
use std::sync::Arc;

use crate::workspace::{Workspace, required_str};

pub struct ReadFileTool {
    workspace: Arc<Workspace>,
}

impl ReadFileTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Reads the content of a specified file."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filepath": {
                    "type": "string",
                    "description": "The path to the file to read."
                }
            },
            "required": ["filepath"]
        })
    }

    fn touches_file(&self) -> bool {
        true
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let filepath = required_str(&arguments, "filepath")?;
        let path = self.workspace.resolve(filepath);

        if !path.is_file() {
            return Err(ToolError::failed(self.name(), format!("File not found: {filepath}")));
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::failed(self.name(), e.to_string()))?;

        Ok(ToolOutput::with_file(content.clone(), FileEffect::Contents(content)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "Hello, World!").unwrap();

        let tool = ReadFileTool::new(Arc::new(Workspace::new(dir.path())));
        let output = tool
            .execute(serde_json::json!({ "filepath": "hello.txt" }))
            .await
            .unwrap();

        assert_eq!(output.content, "Hello, World!");
        assert_eq!(output.file_effect, Some(FileEffect::Contents("Hello, World!".into())));
    }

    #[tokio::test]
    async fn missing_file_is_an_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ReadFileTool::new(Arc::new(Workspace::new(dir.path())));
        let err = tool
            .execute(serde_json::json!({ "filepath": "nope.txt" }))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "File not found: nope.txt");
    }

    #[tokio::test]
    async fn missing_argument() {
        let tool = ReadFileTool::new(Arc::new(Workspace::new("/")));
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
