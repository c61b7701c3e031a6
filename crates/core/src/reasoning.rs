//! The reasoning collaborator interface.
//!
//! A [`Reasoner`] turns a [`Perception`] plus history into raw instruction
//! text. The control loop parses that text into an [`Instruction`]; the
//! reasoner itself never needs to produce valid JSON.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ReasoningError;
use crate::memory::MemoryContext;
use crate::message::Message;
use crate::tool::{ToolCall, ToolDefinition, ToolResult};

/// A parsed reasoning reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// A final answer for the user.
    Text(String),
    /// The first tool call the reply proposed. Extras are dropped at parse time.
    ToolCall(ToolCall),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub os: String,
    pub working_directory: PathBuf,
}

impl EnvironmentInfo {
    pub fn current(working_directory: PathBuf) -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            working_directory,
        }
    }
}

/// Immutable input snapshot for one control-loop iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Perception {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_output: Option<ToolResult>,
    pub memory_context: MemoryContext,
    pub environment: EnvironmentInfo,
}

/// Everything a reasoner sees in one round.
#[derive(Debug, Clone, Copy)]
pub struct ReasoningRequest<'a> {
    pub perception: &'a Perception,
    pub history: &'a [Message],
    pub tools: &'a [ToolDefinition],
}

#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Human-readable name, used in logs.
    fn name(&self) -> &str;

    /// First round of a request: propose a plan or a first action.
    async fn propose_initial_plan(&self, request: ReasoningRequest<'_>) -> Result<String, ReasoningError>;

    /// Later rounds: analyze the last tool output and continue.
    async fn propose_continuation(
        &self,
        tool_output: &ToolResult,
        request: ReasoningRequest<'_>,
    ) -> Result<String, ReasoningError>;
}
