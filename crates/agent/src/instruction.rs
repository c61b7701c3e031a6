//! Turning raw reasoner text into an [`Instruction`].
//!
//! Reasoners are asked for JSON but are not trusted to produce it. Anything
//! that does not parse into one of the accepted shapes is treated as a plain
//! text answer, so parsing never fails.

use codewright_core::reasoning::Instruction;
use codewright_core::tool::ToolCall;
use serde_json::Value;
use tracing::{debug, warn};

/// Parse a reasoner reply.
///
/// Accepted shapes, optionally wrapped in a ```` ``` ```` or ```` ```json ````
/// fence:
/// - `{"text": "..."}`
/// - `{"tool_calls": [{"name": "...", "arguments": {...}}]}`
/// - `{"tool_calls": [{"function": {"name": "...", "arguments": "..."}}]}`
///
/// Arguments may be an object or a JSON-encoded string. Only the first entry
/// of `tool_calls` is parsed; later entries are logged and dropped.
pub fn parse_instruction(raw: &str) -> Instruction {
    let body = strip_fences(raw);

    let Ok(Value::Object(reply)) = serde_json::from_str::<Value>(body) else {
        return Instruction::Text(body.to_string());
    };

    if let Some(Value::Array(calls)) = reply.get("tool_calls") {
        if let Some(first) = calls.first() {
            match parse_call(first) {
                Some(call) => {
                    if calls.len() > 1 {
                        warn!(
                            proposed = calls.len(),
                            ignored = ?calls[1..].iter().map(call_name).collect::<Vec<_>>(),
                            "Only the first tool call is executed"
                        );
                    }
                    return Instruction::ToolCall(call);
                }
                None => debug!("Reply has a malformed first tool call, treating as text"),
            }
        }
    }

    match reply.get("text") {
        Some(Value::String(text)) => Instruction::Text(text.clone()),
        Some(other) => Instruction::Text(other.to_string()),
        None => Instruction::Text(body.to_string()),
    }
}

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"));
    match inner {
        Some(rest) => {
            let rest = rest.trim();
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

fn call_name(entry: &Value) -> &str {
    entry
        .get("function")
        .unwrap_or(entry)
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("<unnamed>")
}

fn parse_call(entry: &Value) -> Option<ToolCall> {
    let call = entry.get("function").unwrap_or(entry);
    let name = call.get("name")?.as_str()?;

    let arguments = match call.get("arguments") {
        None | Some(Value::Null) => Value::Object(Default::default()),
        Some(Value::String(encoded)) if encoded.trim().is_empty() => Value::Object(Default::default()),
        Some(Value::String(encoded)) => match serde_json::from_str::<Value>(encoded) {
            Ok(value @ Value::Object(_)) => value,
            _ => return None,
        },
        Some(value @ Value::Object(_)) => value.clone(),
        Some(_) => return None,
    };

    Some(ToolCall::new(name, arguments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_reply() {
        assert_eq!(
            parse_instruction(r#"{"text": "All done."}"#),
            Instruction::Text("All done.".into())
        );
    }

    #[test]
    fn flat_tool_call() {
        let parsed = parse_instruction(
            r#"{"tool_calls": [{"name": "read_file", "arguments": {"filepath": "a.py"}}]}"#,
        );
        assert_eq!(
            parsed,
            Instruction::ToolCall(ToolCall::new("read_file", json!({"filepath": "a.py"})))
        );
    }

    #[test]
    fn function_wrapped_call_with_string_arguments() {
        let raw = r#"```json
{"tool_calls": [{"function": {"name": "run_command", "arguments": "{\"command\": \"ls\"}"}}]}
```"#;
        assert_eq!(
            parse_instruction(raw),
            Instruction::ToolCall(ToolCall::new("run_command", json!({"command": "ls"})))
        );
    }

    #[test]
    fn extra_calls_are_dropped() {
        let raw = r#"{"tool_calls": [
            {"name": "read_file", "arguments": {"filepath": "a"}},
            {"name": "undo_last_action"}
        ]}"#;
        assert_eq!(
            parse_instruction(raw),
            Instruction::ToolCall(ToolCall::new("read_file", json!({"filepath": "a"})))
        );
    }

    #[test]
    fn malformed_extra_does_not_discard_first_call() {
        let raw = r#"{"tool_calls": [
            {"name": "read_file", "arguments": {"filepath": "a.py"}},
            {"arguments": {}}
        ]}"#;
        assert_eq!(
            parse_instruction(raw),
            Instruction::ToolCall(ToolCall::new("read_file", json!({"filepath": "a.py"})))
        );
    }

    #[test]
    fn bare_fence_is_stripped() {
        assert_eq!(
            parse_instruction("```\n{\"text\": \"hi\"}\n```"),
            Instruction::Text("hi".into())
        );
    }

    #[test]
    fn prose_falls_back_to_text() {
        assert_eq!(
            parse_instruction("  Sure, here is the answer.  "),
            Instruction::Text("Sure, here is the answer.".into())
        );
    }

    #[test]
    fn unknown_json_shape_is_verbatim_text() {
        let raw = r#"{"answer": 42}"#;
        assert_eq!(parse_instruction(raw), Instruction::Text(raw.into()));
    }

    #[test]
    fn empty_tool_calls_use_text_field() {
        let raw = r#"{"tool_calls": [], "text": "nothing to do"}"#;
        assert_eq!(parse_instruction(raw), Instruction::Text("nothing to do".into()));
    }

    #[test]
    fn malformed_first_call_falls_back_to_text() {
        let raw = r#"{"tool_calls": [{"arguments": {}}]}"#;
        assert_eq!(parse_instruction(raw), Instruction::Text(raw.into()));
    }
}
