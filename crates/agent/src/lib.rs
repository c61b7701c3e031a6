//! The control loop of codewright.
//!
//! Each user request runs through a bounded **perceive → reason → act →
//! learn** cycle:
//!
//! 1. **Perceive**: record the input or the last tool output, sync memory,
//!    and snapshot the merged memory context
//! 2. **Reason**: ask the reasoner for an initial plan or a continuation
//! 3. **Act**: parse the reply; answer with text, or dispatch the first
//!    tool call through the confirmation gate
//! 4. **Learn**: record tool usage and periodically distill session patterns
//!
//! The loop ends on a text answer, a denied action, or when the iteration
//! budget runs out.

pub mod instruction;
pub mod loop_runner;
pub mod perception;

pub use instruction::parse_instruction;
pub use loop_runner::{AgentLoop, AgentStatus, LoopState, OutcomeKind, TaskOutcome, TaskStatus};
