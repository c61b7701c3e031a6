//! Line-oriented terminal rendering and the interactive approver.

use async_trait::async_trait;
use codewright_agent::{OutcomeKind, TaskOutcome};
use codewright_core::approval::{ApprovalRequest, Approver};
use codewright_core::event::DomainEvent;
use codewright_core::message::Message;
use codewright_core::tool::{ToolDefinition, ToolResult};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Stdin shared between the prompt loop and the approver.
pub type InputLines = Arc<Mutex<Lines<BufReader<Stdin>>>>;

pub fn input_lines() -> InputLines {
    Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()))
}

/// Print `prompt` and read one line. `None` on end of input.
pub async fn read_line(input: &InputLines, prompt: &str) -> Option<String> {
    print!("{prompt}");
    let _ = std::io::stdout().flush();
    match input.lock().await.next_line().await {
        Ok(line) => line,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read from stdin");
            None
        }
    }
}

/// Asks on the terminal before a destructive call runs.
pub struct TerminalApprover {
    input: InputLines,
}

impl TerminalApprover {
    pub fn new(input: InputLines) -> Self {
        Self { input }
    }
}

#[async_trait]
impl Approver for TerminalApprover {
    async fn confirm(&self, request: &ApprovalRequest) -> bool {
        println!();
        println!("  [confirm] {}", request.description);
        if let Some(preview) = &request.preview {
            println!("  --- preview ({}) ---", preview.kind.as_str());
            for line in preview.content.lines() {
                println!("  | {line}");
            }
            println!("  ---");
        }

        let answer = read_line(&self.input, "  Proceed? [y/N] ").await;
        matches!(
            answer.as_deref().map(str::trim).map(str::to_ascii_lowercase).as_deref(),
            Some("y" | "yes")
        )
    }
}

pub fn print_outcome(outcome: &TaskOutcome) {
    println!();
    match outcome.kind {
        OutcomeKind::TextResponse => {
            for line in outcome.message.lines() {
                println!("  Assistant > {line}");
            }
        }
        OutcomeKind::Cancelled => println!("  {}", outcome.message),
        OutcomeKind::IterationBudgetExceeded => {
            println!("  [Error] {}. Task may be incomplete.", outcome.message)
        }
    }
    println!();
}

pub fn print_tool_result(result: &ToolResult) {
    println!("  [{}] {}: {}", result.status(), result.tool_name, result.text());
}

pub fn print_event(event: &DomainEvent) {
    if let DomainEvent::ToolExecuted {
        tool_name,
        status,
        duration_ms,
        ..
    } = event
    {
        eprintln!("  ... {tool_name} -> {status} ({duration_ms} ms)");
    }
}

pub fn print_history(history: &[Message]) {
    if history.is_empty() {
        println!("  (no history yet)");
        return;
    }
    for message in history {
        let content: String = message.content.chars().take(300).collect();
        let ellipsis = if message.content.chars().count() > 300 { "..." } else { "" };
        println!(
            "  {} [{}] {content}{ellipsis}",
            message.timestamp.format("%H:%M:%S"),
            message.role.as_str()
        );
    }
}

pub fn print_help(tools: &[ToolDefinition]) {
    println!();
    println!("  Commands: exit, help, status, history, undo");
    println!();
    println!("  Tools:");
    for tool in tools {
        println!("    {}: {}", tool.name, tool.description);
        let required: Vec<&str> = tool.parameters["required"]
            .as_array()
            .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();
        if let Some(properties) = tool.parameters["properties"].as_object() {
            for (param, schema) in properties {
                let marker = if required.contains(&param.as_str()) { " (required)" } else { "" };
                println!(
                    "      - {param}: {} {}{marker}",
                    schema["type"].as_str().unwrap_or("any"),
                    schema["description"].as_str().unwrap_or("")
                );
            }
        }
    }
    println!();
}
