//! Tool trait: the abstraction over the assistant's capabilities.
//!
//! Tools are what let the assistant act on a project: read and write files,
//! run shell and git commands, search, lint, test, undo.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::action::ActionRecord;
use crate::approval::Preview;
use crate::error::ToolError;

/// A request to execute a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON object
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Machine-checkable category of a failed tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ToolNotFound,
    ArgumentError,
    ExecutionError,
    UndoError,
}

/// What happened when a tool call was dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success {
        content: String,
    },
    #[serde(rename = "error")]
    Failure {
        kind: FailureKind,
        message: String,
    },
    Cancelled {
        message: String,
    },
}

/// The result of a dispatched tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_name: String,

    #[serde(flatten)]
    pub outcome: ToolOutcome,

    /// Wall-clock time spent in the tool
    pub execution_time_ms: u64,
}

impl ToolResult {
    pub fn success(tool_name: impl Into<String>, content: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            tool_name: tool_name.into(),
            outcome: ToolOutcome::Success {
                content: content.into(),
            },
            execution_time_ms,
        }
    }

    pub fn failure(
        tool_name: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            outcome: ToolOutcome::Failure {
                kind,
                message: message.into(),
            },
            execution_time_ms,
        }
    }

    pub fn cancelled(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            outcome: ToolOutcome::Cancelled {
                message: "Action cancelled by user.".into(),
            },
            execution_time_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Cancelled { .. })
    }

    /// `success`, `error` or `cancelled`.
    pub fn status(&self) -> &'static str {
        match self.outcome {
            ToolOutcome::Success { .. } => "success",
            ToolOutcome::Failure { .. } => "error",
            ToolOutcome::Cancelled { .. } => "cancelled",
        }
    }

    /// The content on success, otherwise the message.
    pub fn text(&self) -> &str {
        match &self.outcome {
            ToolOutcome::Success { content } => content,
            ToolOutcome::Failure { message, .. } | ToolOutcome::Cancelled { message } => message,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.outcome {
            ToolOutcome::Failure { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

/// How a successful tool call left the file it touched.
#[derive(Debug, Clone, PartialEq)]
pub enum FileEffect {
    /// The file now holds this content.
    Contents(String),
    /// The file no longer exists.
    Removed,
}

/// Raw output of [`Tool::execute`], before the dispatcher wraps it.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    pub file_effect: Option<FileEffect>,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            file_effect: None,
        }
    }

    pub fn with_file(content: impl Into<String>, effect: FileEffect) -> Self {
        Self {
            content: content.into(),
            file_effect: Some(effect),
        }
    }
}

/// Schema of a tool as presented to the reasoner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// The core Tool trait.
///
/// Each operation in the catalog implements this trait and is registered in
/// the [`ToolRegistry`]. The dispatcher consults the hook methods before
/// and after [`Tool::execute`] to drive confirmation, undo and memory
/// bookkeeping.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the reasoner).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Whether this tool operates on the file named by its `filepath` argument.
    fn touches_file(&self) -> bool {
        false
    }

    /// The shell command line this call would run, if it runs one.
    fn command_line(&self, _arguments: &serde_json::Value) -> Option<String> {
        None
    }

    /// Content shown to the approver alongside the confirmation prompt.
    fn preview(&self, _arguments: &serde_json::Value) -> Option<Preview> {
        None
    }

    /// Capture whatever is needed to reverse this call. Runs after
    /// confirmation and before [`Tool::execute`].
    async fn snapshot(&self, _arguments: &serde_json::Value) -> Result<Option<ActionRecord>, ToolError> {
        Ok(None)
    }

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError>;

    /// Convert this tool into a ToolDefinition for the reasoner.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools, ordered by name.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: BTreeMap::new() }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// All tool definitions, for the reasoner and the CLI `help` command.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
