//! # codewright core
//!
//! Domain types, traits, and error definitions shared by every codewright
//! crate. Implementations live elsewhere:
//! - `codewright-memory` builds the [`memory::MemoryContext`]
//! - `codewright-tools` implements [`tool::Tool`] and dispatches calls
//! - `codewright-providers` implements [`reasoning::Reasoner`]
//! - `codewright-agent` drives the perceive → reason → act → learn loop

pub mod action;
pub mod approval;
pub mod error;
pub mod event;
pub mod memory;
pub mod message;
pub mod reasoning;
pub mod tool;

pub use action::ActionRecord;
pub use approval::{ApprovalRequest, Approver, AutoApprove, AutoDeny, Preview, PreviewKind};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use memory::MemoryContext;
pub use message::{Conversation, Message, Role};
pub use reasoning::{EnvironmentInfo, Instruction, Perception, Reasoner, ReasoningRequest};
pub use tool::{FailureKind, FileEffect, Tool, ToolCall, ToolDefinition, ToolOutcome, ToolOutput, ToolRegistry, ToolResult};
