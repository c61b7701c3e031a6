//! Prompt construction for chat-completion reasoners.
//!
//! The reply contract is plain JSON in the message text, either
//! `{"text": "..."}` or `{"tool_calls": [{"name": ..., "arguments": {...}}]}`,
//! so any chat model works without native function calling.

use codewright_core::memory::MemoryContext;
use codewright_core::message::Message;
use codewright_core::reasoning::{EnvironmentInfo, ReasoningRequest};
use codewright_core::tool::{ToolDefinition, ToolResult};

/// History entries replayed in continuation prompts.
const CONTINUATION_HISTORY: usize = 5;

pub fn system_prompt(environment: &EnvironmentInfo) -> String {
    format!(
        "You are a coding assistant working inside a local project. You work in a \
perceive, reason, act, learn loop and choose exactly ONE next action per reply.

Reply with a single JSON object and nothing else:
- to call a tool: {{\"tool_calls\": [{{\"name\": \"tool_name\", \"arguments\": {{\"key\": \"value\"}}}}]}}
- to answer the user: {{\"text\": \"your answer\"}}

Rules:
- One tool call per reply. You will see its result before choosing the next step.
- If the user asks to be shown code without asking to save it, answer with text and put the code in a markdown block.
- Use write_file only when the user asks to create or save a file; ask for the filename if it is missing.
- Use apply_code_change for partial edits and write_file for whole-file rewrites.
- Use run_git_command for git, list_directory_contents instead of `ls`, search_files to locate code.
- If the user asks to undo, call undo_last_action.
- write_file, delete_file, clear_file_content, apply_code_change and run_command ask the user first. \
If the user denies an action, do not retry it.

Operating system: {}
Project directory: {}",
        environment.os,
        environment.working_directory.display()
    )
}

/// A compact digest of what memory knows, for the reasoner.
pub fn memory_section(context: &MemoryContext) -> String {
    let frequent: Vec<&str> = context
        .frequently_accessed_files
        .iter()
        .map(|f| f.filepath.as_str())
        .collect();
    let active: Vec<String> = context
        .active_files
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    let weak_tools: Vec<String> = context
        .tool_effectiveness
        .iter()
        .filter(|(_, stats)| stats.total_uses >= 3 && stats.success_rate < 0.5)
        .map(|(name, stats)| format!("{name} ({:.0}% success)", stats.success_rate * 100.0))
        .collect();

    let mut out = String::from("Memory context:\n");
    out.push_str(&format!("- Frequently accessed files: {frequent:?}\n"));
    out.push_str(&format!("- Active files in session: {active:?}\n"));
    out.push_str(&format!("- Recent operations: {}\n", context.recent_operations.len()));
    if !context.error_context.is_empty() {
        let errors: Vec<String> = context
            .error_context
            .iter()
            .map(|(path, state)| format!("{path}: {}", state.error))
            .collect();
        out.push_str(&format!("- Recent errors: {errors:?}\n"));
    }
    if !weak_tools.is_empty() {
        out.push_str(&format!("- Unreliable tools: {weak_tools:?}\n"));
    }
    let preferences: Vec<&String> = context.user_preferences.keys().collect();
    out.push_str(&format!("- Known user preferences: {preferences:?}\n"));
    out
}

fn history_section(history: &[Message]) -> String {
    history
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn tools_section(tools: &[ToolDefinition]) -> String {
    serde_json::to_string(tools).unwrap_or_else(|_| "[]".into())
}

pub fn initial_plan_prompt(request: ReasoningRequest<'_>) -> String {
    format!(
        "{memory}
Conversation history:
{history}

Available tools: {tools}

Based on the conversation, what is the SINGLE next action? If the request \
needs no tools (a general question), answer with text directly.",
        memory = memory_section(&request.perception.memory_context),
        history = history_section(request.history),
        tools = tools_section(request.tools),
    )
}

pub fn continuation_prompt(tool_output: &ToolResult, request: ReasoningRequest<'_>) -> String {
    let last_user = request
        .history
        .iter()
        .rev()
        .find(|m| m.role == codewright_core::message::Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or_default();
    let recent = &request.history[request.history.len().saturating_sub(CONTINUATION_HISTORY)..];
    let output = serde_json::to_string(tool_output).unwrap_or_else(|_| tool_output.text().to_string());

    format!(
        "You are continuing work on the user's request.

Original user request: {last_user}

Latest tool output: {output}

Recent conversation:
{history}

{memory}
Available tools: {tools}

Decide: did the tool succeed, and is the request complete? If more steps are \
needed reply with the next tool call; if it is complete reply with a text \
summary. If the tool failed, explain the error and choose a concrete next \
step to resolve it, or tell the user what is needed.",
        history = history_section(recent),
        memory = memory_section(&request.perception.memory_context),
        tools = tools_section(request.tools),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use codewright_core::memory::ToolEffectiveness;
    use codewright_core::reasoning::Perception;

    fn perception() -> Perception {
        Perception {
            user_input: Some("list files".into()),
            tool_output: None,
            memory_context: MemoryContext::default(),
            environment: EnvironmentInfo::current("/project".into()),
        }
    }

    #[test]
    fn system_prompt_names_environment() {
        let prompt = system_prompt(&EnvironmentInfo {
            os: "linux".into(),
            working_directory: "/project".into(),
        });
        assert!(prompt.contains("Operating system: linux"));
        assert!(prompt.contains("Project directory: /project"));
        assert!(prompt.contains("\"tool_calls\""));
    }

    #[test]
    fn initial_prompt_includes_history_and_tools() {
        let perception = perception();
        let history = vec![Message::user("list files")];
        let tools = vec![ToolDefinition {
            name: "list_directory_contents".into(),
            description: "Lists files".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let prompt = initial_plan_prompt(ReasoningRequest {
            perception: &perception,
            history: &history,
            tools: &tools,
        });
        assert!(prompt.contains("user: list files"));
        assert!(prompt.contains("list_directory_contents"));
    }

    #[test]
    fn continuation_prompt_carries_tool_output() {
        let perception = perception();
        let history = vec![Message::user("read a.py"), Message::assistant("{}")];
        let output = ToolResult::success("read_file", "print(1)", 2);
        let prompt = continuation_prompt(
            &output,
            ReasoningRequest {
                perception: &perception,
                history: &history,
                tools: &[],
            },
        );
        assert!(prompt.contains("Original user request: read a.py"));
        assert!(prompt.contains("print(1)"));
    }

    #[test]
    fn memory_section_flags_unreliable_tools() {
        let mut context = MemoryContext::default();
        context.tool_effectiveness.insert(
            "run_tests".into(),
            ToolEffectiveness {
                total_uses: 4,
                successful_uses: 1,
                failed_uses: 3,
                success_rate: 0.25,
                avg_execution_time_ms: 10.0,
                common_errors: Vec::new(),
            },
        );
        let section = memory_section(&context);
        assert!(section.contains("run_tests (25% success)"));
    }
}
