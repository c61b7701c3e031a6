//! `search_files`: substring search over one file, a directory tree, or
//! the top level of the project.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{Tool, ToolOutput};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::workspace::{Workspace, optional_str, required_str};

pub struct SearchFilesTool {
    workspace: Arc<Workspace>,
}

impl SearchFilesTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    /// Files to search paired with the label shown for each hit.
    fn candidates(&self, directory: Option<&str>) -> Vec<(PathBuf, String)> {
        match directory {
            Some(label) => {
                let dir = self.workspace.resolve(label);
                WalkDir::new(&dir)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
                    .filter_map(Result::ok)
                    .filter(|e| e.file_type().is_file())
                    .map(|e| {
                        let relative = e.path().strip_prefix(&dir).unwrap_or(e.path());
                        let shown = Path::new(label).join(relative).display().to_string();
                        (e.into_path(), shown)
                    })
                    .collect()
            }
            None => {
                let root = self.workspace.root();
                let Ok(entries) = std::fs::read_dir(root) else {
                    return Vec::new();
                };
                let mut files: Vec<(PathBuf, String)> = entries
                    .filter_map(Result::ok)
                    .filter(|e| e.path().is_file())
                    .map(|e| (e.path(), e.file_name().to_string_lossy().into_owned()))
                    .collect();
                files.sort();
                files
            }
        }
    }
}

fn matching_lines(query: &str, content: &str, label: &str, out: &mut Vec<String>) {
    for (index, line) in content.lines().enumerate() {
        if line.contains(query) {
            out.push(format!("{label}:{}: {line}", index + 1));
        }
    }
}

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> &str {
        "search_files"
    }

    fn description(&self) -> &str {
        "Searches for a text query within a file, a directory (recursively), or the project root."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The text to search for."
                },
                "filepath": {
                    "type": "string",
                    "description": "Optional single file to search."
                },
                "directory_path": {
                    "type": "string",
                    "description": "Optional directory to search recursively."
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let query = required_str(&arguments, "query")?;
        let mut hits = Vec::new();

        if let Some(filepath) = optional_str(&arguments, "filepath") {
            let path = self.workspace.resolve(filepath);
            if !path.is_file() {
                return Err(ToolError::failed(self.name(), format!("File not found: {filepath}")));
            }
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| ToolError::failed(self.name(), e.to_string()))?;
            matching_lines(query, &content, filepath, &mut hits);
        } else {
            for (path, label) in self.candidates(optional_str(&arguments, "directory_path")) {
                // Binary and unreadable files are skipped.
                if let Ok(content) = tokio::fs::read_to_string(&path).await {
                    matching_lines(query, &content, &label, &mut hits);
                }
            }
        }

        if hits.is_empty() {
            Ok(ToolOutput::text(format!("No lines found matching '{query}'.")))
        } else {
            Ok(ToolOutput::text(hits.join("\n")))
        }
    }
}
