//! The control loop implementation.

use chrono::Utc;
use codewright_core::event::{DomainEvent, EventBus};
use codewright_core::message::Message;
use codewright_core::reasoning::{EnvironmentInfo, Instruction, Perception, Reasoner, ReasoningRequest};
use codewright_core::tool::{FailureKind, ToolCall, ToolResult};
use codewright_memory::{MemorySummary, SharedMemory};
use codewright_tools::Dispatcher;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::instruction::parse_instruction;
use crate::perception::perceive;

/// History entry recorded when the user rejects a destructive action.
pub const DENIAL_NOTE: &str = "User denied the action.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Idle,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Success,
    Cancelled,
    Error,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    TextResponse,
    Cancelled,
    IterationBudgetExceeded,
}

/// How a user request ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    pub status: TaskStatus,
    pub kind: OutcomeKind,
    pub message: String,
    /// Iterations spent on this request
    pub iterations: u32,
}

impl TaskOutcome {
    fn new(status: TaskStatus, kind: OutcomeKind, message: impl Into<String>, iterations: u32) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
            iterations,
        }
    }
}

/// Snapshot for the `status` command.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub state: LoopState,
    pub conversation_length: usize,
    pub memory: MemorySummary,
}

/// What the act step produced.
enum Step {
    Answer(String),
    Executed(ToolCall, ToolResult),
}

/// Drives one request at a time through perceive → reason → act → learn.
pub struct AgentLoop {
    /// The reasoning collaborator
    reasoner: Arc<dyn Reasoner>,

    /// Tool catalog behind the confirmation gate
    dispatcher: Dispatcher,

    memory: SharedMemory,

    environment: EnvironmentInfo,

    /// Hard bound on iterations per request
    max_iterations: u32,

    /// Run session learning every this many iterations
    learn_every: u32,

    events: Option<Arc<EventBus>>,

    /// Session-long message history
    history: Vec<Message>,

    state: LoopState,

    /// Iterations across every request in this session
    session_iterations: u32,
}

impl AgentLoop {
    pub fn new(reasoner: Arc<dyn Reasoner>, dispatcher: Dispatcher, project_root: impl Into<PathBuf>) -> Self {
        let memory = dispatcher.memory().clone();
        Self {
            reasoner,
            dispatcher,
            memory,
            environment: EnvironmentInfo::current(project_root.into()),
            max_iterations: 10,
            learn_every: 10,
            events: None,
            history: Vec::new(),
            state: LoopState::Idle,
            session_iterations: 0,
        }
    }

    /// Set the maximum number of iterations per request.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    /// Set how often session learning runs.
    pub fn with_learn_every(mut self, every: u32) -> Self {
        self.learn_every = every.max(1);
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub async fn status(&self) -> AgentStatus {
        AgentStatus {
            state: self.state,
            conversation_length: self.history.len(),
            memory: self.memory.lock().await.memory_summary(),
        }
    }

    /// Handle one user request until it is answered, cancelled, or the
    /// iteration budget runs out.
    ///
    /// Returns `Err` only when the reasoner itself fails.
    pub async fn run(&mut self, user_input: &str) -> codewright_core::Result<TaskOutcome> {
        info!(reasoner = self.reasoner.name(), "Processing request");
        self.state = LoopState::Active;

        self.history.push(Message::user(user_input));
        let mut perception = self.perceive(Some(user_input.to_string()), None).await;
        let definitions = self.dispatcher.definitions();
        let mut iteration = 0;

        while iteration < self.max_iterations {
            iteration += 1;
            self.session_iterations += 1;
            debug!(iteration, "Control loop iteration");

            // ── Reason ──
            let request = ReasoningRequest {
                perception: &perception,
                history: &self.history,
                tools: &definitions,
            };
            let reply = match &perception.tool_output {
                Some(output) if iteration > 1 => self.reasoner.propose_continuation(output, request).await,
                _ => self.reasoner.propose_initial_plan(request).await,
            };
            let reply = match reply {
                Ok(reply) => reply,
                Err(e) => {
                    error!(error = %e, iteration, "Reasoner failed");
                    self.state = LoopState::Idle;
                    return Err(e.into());
                }
            };

            // ── Act ──
            let (call, result) = match self.act(&reply).await {
                Step::Answer(text) => {
                    return Ok(self.finish(TaskOutcome::new(
                        TaskStatus::Success,
                        OutcomeKind::TextResponse,
                        text,
                        iteration,
                    )));
                }
                Step::Executed(call, result) => (call, result),
            };

            if result.is_cancelled() {
                self.history.push(Message::user_action(DENIAL_NOTE));
                return Ok(self.finish(TaskOutcome::new(
                    TaskStatus::Cancelled,
                    OutcomeKind::Cancelled,
                    result.text(),
                    iteration,
                )));
            }

            // ── Learn ──
            self.learn(&call, &result).await;

            // ── Perceive the outcome for the next round ──
            match serde_json::to_string(&result) {
                Ok(serialized) => self.history.push(Message::tool_output(serialized)),
                Err(e) => warn!(error = %e, "Failed to serialize tool output"),
            }
            perception = self.perceive(None, Some(result)).await;
        }

        warn!(max = self.max_iterations, "Iteration budget exhausted");
        Ok(self.finish(TaskOutcome::new(
            TaskStatus::Error,
            OutcomeKind::IterationBudgetExceeded,
            format!("Maximum iterations ({}) reached", self.max_iterations),
            iteration,
        )))
    }

    async fn perceive(&self, user_input: Option<String>, tool_output: Option<ToolResult>) -> Perception {
        perceive(
            &self.memory,
            &self.environment,
            self.events.as_deref(),
            user_input,
            tool_output,
        )
        .await
    }

    /// Parse the reply and run at most one tool call.
    async fn act(&mut self, reply: &str) -> Step {
        let call = match parse_instruction(reply) {
            Instruction::Text(text) => {
                self.history.push(Message::assistant(text.clone()));
                return Step::Answer(text);
            }
            Instruction::ToolCall(call) => call,
        };

        self.history.push(Message::assistant(tool_call_entry(&call)));
        debug!(tool = %call.name, "Dispatching tool call");
        let result = self.dispatcher.dispatch(&call).await;
        Step::Executed(call, result)
    }

    async fn learn(&self, call: &ToolCall, result: &ToolResult) {
        let mut memory = self.memory.lock().await;

        if result.failure_kind() != Some(FailureKind::ToolNotFound) {
            let error = (!result.is_success()).then(|| result.text());
            memory.record_tool_usage(
                &result.tool_name,
                result.is_success(),
                Some(result.execution_time_ms),
                error,
                Some(serde_json::json!({ "arguments": call.arguments })),
            );
        }

        if self.session_iterations % self.learn_every == 0 {
            debug!(iterations = self.session_iterations, "Learning from session");
            memory.learn_from_session();
        }
    }

    fn finish(&mut self, outcome: TaskOutcome) -> TaskOutcome {
        self.state = LoopState::Idle;
        info!(
            status = ?outcome.status,
            kind = ?outcome.kind,
            iterations = outcome.iterations,
            "Request finished"
        );
        if let Some(events) = &self.events {
            events.publish(DomainEvent::TaskCompleted {
                status: outcome.status.as_str().to_string(),
                iterations: outcome.iterations,
                timestamp: Utc::now(),
            });
        }
        outcome
    }
}

/// History text for an executed tool call.
fn tool_call_entry(call: &ToolCall) -> String {
    format!(
        "TOOL_CALL: {}",
        serde_json::json!({ "name": call.name, "arguments": call.arguments })
    )
}
