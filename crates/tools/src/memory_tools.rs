//! Memory introspection tools: `get_memory_status` and
//! `search_memory_patterns`.
//!
//! These give the reasoner read access to the memory manager on demand.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{Tool, ToolOutput};
use codewright_memory::SharedMemory;
use serde_json::{Map, Value};

use crate::workspace::optional_str;

fn to_pretty<T: serde::Serialize>(tool_name: &str, value: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value).map_err(|e| ToolError::failed(tool_name, e.to_string()))
}

pub struct GetMemoryStatusTool {
    memory: SharedMemory,
}

impl GetMemoryStatusTool {
    pub fn new(memory: SharedMemory) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for GetMemoryStatusTool {
    fn name(&self) -> &str {
        "get_memory_status"
    }

    fn description(&self) -> &str {
        "Reports the current session and persistent memory state."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let summary = self.memory.lock().await.memory_summary();
        Ok(ToolOutput::text(to_pretty(self.name(), &summary)?))
    }
}

pub struct SearchMemoryPatternsTool {
    memory: SharedMemory,
}

impl SearchMemoryPatternsTool {
    pub fn new(memory: SharedMemory) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for SearchMemoryPatternsTool {
    fn name(&self) -> &str {
        "search_memory_patterns"
    }

    fn description(&self) -> &str {
        "Searches learned patterns in memory. Use pattern_type 'tool_effectiveness' for tool statistics."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern_type": {
                    "type": "string",
                    "description": "Optional pattern type, or 'tool_effectiveness'."
                },
                "query": {
                    "type": "string",
                    "description": "Optional query matched against pattern context."
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let pattern_type = optional_str(&arguments, "pattern_type");
        let memory = self.memory.lock().await;

        if pattern_type == Some("tool_effectiveness") {
            return Ok(ToolOutput::text(to_pretty(self.name(), &memory.tool_effectiveness())?));
        }

        let mut context = Map::new();
        if let Some(query) = optional_str(&arguments, "query") {
            context.insert("query".into(), Value::String(query.to_string()));
        }
        let patterns = memory.relevant_patterns(&context, pattern_type);
        Ok(ToolOutput::text(to_pretty(self.name(), &patterns)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codewright_config::MemoryConfig;
    use codewright_memory::MemoryManager;

    fn memory(root: &std::path::Path) -> SharedMemory {
        MemoryManager::new(root, &MemoryConfig::default()).shared()
    }

    #[tokio::test]
    async fn status_is_json() {
        let dir = tempfile::tempdir().unwrap();
        let memory = memory(dir.path());
        let session_id = memory.lock().await.session_id().to_string();

        let output = GetMemoryStatusTool::new(memory)
            .execute(serde_json::json!({}))
            .await
            .unwrap();
        let json: Value = serde_json::from_str(&output.content).unwrap();
        assert_eq!(json["session_id"], session_id.as_str());
        assert!(json["persistent"].is_object());
    }

    #[tokio::test]
    async fn tool_effectiveness_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let memory = memory(dir.path());
        memory
            .lock()
            .await
            .record_tool_usage("read_file", true, Some(4), None, None);

        let output = SearchMemoryPatternsTool::new(memory)
            .execute(serde_json::json!({ "pattern_type": "tool_effectiveness" }))
            .await
            .unwrap();
        let json: Value = serde_json::from_str(&output.content).unwrap();
        assert_eq!(json["read_file"]["total_uses"], 1);
    }

    #[tokio::test]
    async fn empty_store_has_no_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let output = SearchMemoryPatternsTool::new(memory(dir.path()))
            .execute(serde_json::json!({ "query": "refactor" }))
            .await
            .unwrap();
        assert_eq!(output.content, "[]");
    }
}
