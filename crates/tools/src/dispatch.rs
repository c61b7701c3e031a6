//! Tool dispatch: the single entry point from the control loop to the
//! tool catalog.
//!
//! For every call the dispatcher:
//! 1. resolves the tool by name
//! 2. asks the approver when the tool is destructive
//! 3. snapshots what undo needs, then executes
//! 4. pushes the snapshot onto the action log on success
//! 5. tells the memory manager what happened to the file or command
//!
//! Tool errors never escape: they come back as [`ToolResult`] failures.

use chrono::Utc;
use codewright_core::approval::{ApprovalRequest, Approver};
use codewright_core::error::ToolError;
use codewright_core::event::{DomainEvent, EventBus};
use codewright_core::tool::{FileEffect, Tool, ToolCall, ToolDefinition, ToolOutput, ToolRegistry, ToolResult};
use codewright_memory::SharedMemory;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::action_log::{self, SharedActionLog};
use crate::workspace::Workspace;

/// Tools that must be confirmed before they run.
pub const DESTRUCTIVE_TOOLS: &[&str] = &[
    "write_file",
    "delete_file",
    "clear_file_content",
    "apply_code_change",
    "edit_notebook",
    "run_command",
];

pub fn is_destructive(tool_name: &str) -> bool {
    DESTRUCTIVE_TOOLS.contains(&tool_name)
}

pub struct Dispatcher {
    registry: ToolRegistry,
    workspace: Arc<Workspace>,
    memory: SharedMemory,
    action_log: SharedActionLog,
    approver: Arc<dyn Approver>,
    events: Option<Arc<EventBus>>,
}

impl Dispatcher {
    pub fn new(
        registry: ToolRegistry,
        workspace: Arc<Workspace>,
        memory: SharedMemory,
        action_log: SharedActionLog,
        approver: Arc<dyn Approver>,
    ) -> Self {
        Self {
            registry,
            workspace,
            memory,
            action_log,
            approver,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    pub fn action_log(&self) -> &SharedActionLog {
        &self.action_log
    }

    pub fn memory(&self) -> &SharedMemory {
        &self.memory
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Reverse the most recent destructive file operation.
    pub async fn undo(&self) -> ToolResult {
        self.dispatch(&ToolCall::new("undo_last_action", serde_json::json!({})))
            .await
    }

    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let Some(tool) = self.registry.get(&call.name) else {
            warn!(tool = %call.name, "Unknown tool requested");
            let err = ToolError::NotFound(call.name.clone());
            return ToolResult::failure(&call.name, err.kind(), err.message(), 0);
        };

        if is_destructive(tool.name()) && !self.confirm(tool, &call.arguments).await {
            info!(tool = %call.name, kind = "ConfirmationDenied", "Destructive call denied");
            let result = ToolResult::cancelled(&call.name);
            self.publish(&result);
            return result;
        }

        let started = Instant::now();
        let outcome = self.run(tool, &call.arguments).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        self.notify_memory(tool, &call.arguments, &outcome, elapsed_ms)
            .await;

        let result = match outcome {
            Ok(output) => ToolResult::success(&call.name, output.content, elapsed_ms),
            Err(e) => {
                debug!(tool = %call.name, error = %e, "Tool call failed");
                ToolResult::failure(&call.name, e.kind(), e.message(), elapsed_ms)
            }
        };

        self.publish(&result);
        result
    }

    async fn confirm(&self, tool: &dyn Tool, arguments: &serde_json::Value) -> bool {
        let target = arguments["filepath"].as_str().unwrap_or("N/A");
        let request = ApprovalRequest {
            tool_name: tool.name().to_string(),
            description: format!(
                "The agent wants to execute '{}' on '{target}'. Args: {arguments}",
                tool.name()
            ),
            preview: tool.preview(arguments),
        };
        self.approver.confirm(&request).await
    }

    /// Snapshot, execute, and log the snapshot if execution succeeded.
    async fn run(&self, tool: &dyn Tool, arguments: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let record = tool.snapshot(arguments).await?;
        let output = tool.execute(arguments.clone()).await?;

        if let Some(record) = record {
            debug!(kind = record.kind(), path = %record.path().display(), "Recording reversible action");
            action_log::lock(&self.action_log).push(record);
        }
        Ok(output)
    }

    async fn notify_memory(
        &self,
        tool: &dyn Tool,
        arguments: &serde_json::Value,
        outcome: &Result<ToolOutput, ToolError>,
        elapsed_ms: u64,
    ) {
        let filepath = arguments["filepath"].as_str().filter(|_| tool.touches_file());
        let command = tool.command_line(arguments);
        if filepath.is_none() && command.is_none() {
            return;
        }

        let mut memory = self.memory.lock().await;

        if let Some(filepath) = filepath {
            let path = self.workspace.resolve(filepath);
            match outcome.as_ref().ok().and_then(|o| o.file_effect.as_ref()) {
                Some(FileEffect::Contents(content)) => {
                    memory.cache_file_content(&path, content);
                }
                Some(FileEffect::Removed) => memory.forget_file(&path),
                None => {}
            }
            let error = outcome.as_ref().err().map(ToolError::message);
            memory.record_file_operation(&path, tool.name(), outcome.is_ok(), error.as_deref());
        }

        if let Some(command) = command {
            let (success, output) = match outcome {
                Ok(output) => (true, output.content.clone()),
                Err(e) => (false, e.message()),
            };
            memory.record_command(&command, success, Some(&output), Some(elapsed_ms));
        }
    }

    fn publish(&self, result: &ToolResult) {
        if let Some(events) = &self.events {
            events.publish(DomainEvent::ToolExecuted {
                tool_name: result.tool_name.clone(),
                status: result.status().to_string(),
                duration_ms: result.execution_time_ms,
                timestamp: Utc::now(),
            });
        }
    }
}
