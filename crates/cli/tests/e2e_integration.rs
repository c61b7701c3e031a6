//! End-to-end tests for codewright.
//!
//! These drive the full stack (control loop, dispatcher, real tools and both
//! memory tiers) against a temporary project, with a scripted reasoner
//! standing in for the LLM.

use std::path::Path;
use std::sync::{Arc, Mutex};

use codewright_agent::{AgentLoop, LoopState, OutcomeKind, TaskStatus};
use codewright_config::{MemoryConfig, ToolsConfig};
use codewright_core::approval::{Approver, AutoApprove, AutoDeny};
use codewright_core::error::ReasoningError;
use codewright_core::event::{DomainEvent, EventBus};
use codewright_core::message::Role;
use codewright_core::reasoning::{Reasoner, ReasoningRequest};
use codewright_core::tool::{FailureKind, ToolResult};
use codewright_memory::{MemoryManager, RelevantPattern};
use codewright_tools::{ActionLog, Dispatcher, Workspace, default_registry};
use serde_json::json;

// ── Scripted Reasoner ────────────────────────────────────────────────────

/// Returns canned replies in order and remembers what it was shown.
struct ScriptedReasoner {
    replies: Mutex<Vec<String>>,
    call_count: Mutex<usize>,
    seen_tool_outputs: Mutex<Vec<ToolResult>>,
}

impl ScriptedReasoner {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            call_count: Mutex::new(0),
            seen_tool_outputs: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    fn next_reply(&self) -> String {
        let mut count = self.call_count.lock().unwrap();
        let replies = self.replies.lock().unwrap();
        let reply = replies
            .get(*count)
            .cloned()
            .unwrap_or_else(|| panic!("ScriptedReasoner exhausted: call #{}, have {}", *count, replies.len()));
        *count += 1;
        reply
    }
}

#[async_trait::async_trait]
impl Reasoner for ScriptedReasoner {
    fn name(&self) -> &str {
        "e2e_scripted"
    }

    async fn propose_initial_plan(&self, _request: ReasoningRequest<'_>) -> Result<String, ReasoningError> {
        Ok(self.next_reply())
    }

    async fn propose_continuation(
        &self,
        tool_output: &ToolResult,
        _request: ReasoningRequest<'_>,
    ) -> Result<String, ReasoningError> {
        self.seen_tool_outputs.lock().unwrap().push(tool_output.clone());
        Ok(self.next_reply())
    }
}

fn call(name: &str, arguments: serde_json::Value) -> String {
    json!({ "tool_calls": [{ "name": name, "arguments": arguments }] }).to_string()
}

fn text(answer: &str) -> String {
    json!({ "text": answer }).to_string()
}

fn build_agent(root: &Path, reasoner: Arc<dyn Reasoner>, approver: Arc<dyn Approver>) -> AgentLoop {
    let memory = MemoryManager::new(root, &MemoryConfig::default()).shared();
    let workspace = Arc::new(Workspace::from_config(root, &ToolsConfig::default()));
    let log = ActionLog::shared();
    let registry = default_registry(workspace.clone(), memory.clone(), log.clone(), &ToolsConfig::default());
    AgentLoop::new(reasoner, Dispatcher::new(registry, workspace, memory, log, approver), root)
}

// ── Scenario 1: write a new file, then undo ──────────────────────────────

#[tokio::test]
async fn e2e_write_new_file_then_undo_removes_it() {
    let dir = tempfile::tempdir().unwrap();
    let write = call("write_file", json!({ "filepath": "hello.py", "content": "print('hi')\n" }));
    let done = text("Created hello.py.");
    let reasoner = ScriptedReasoner::new(&[write.as_str(), done.as_str()]);
    let mut agent = build_agent(dir.path(), reasoner.clone(), Arc::new(AutoApprove));

    let outcome = agent.run("create hello.py").await.unwrap();

    assert_eq!(outcome.kind, OutcomeKind::TextResponse);
    assert_eq!(outcome.iterations, 2);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("hello.py")).unwrap(),
        "print('hi')\n"
    );
    assert_eq!(agent.dispatcher().action_log().lock().unwrap().len(), 1);

    let seen = reasoner.seen_tool_outputs.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].is_success());
    assert_eq!(seen[0].text(), "File hello.py written successfully.");

    let undo = agent.dispatcher().undo().await;
    assert!(undo.is_success(), "{undo:?}");
    assert!(!dir.path().join("hello.py").exists());
    assert!(agent.dispatcher().action_log().lock().unwrap().is_empty());
    assert!(
        agent
            .dispatcher()
            .memory()
            .lock()
            .await
            .file_content(&dir.path().join("hello.py"))
            .is_none()
    );
}

// ── Scenario 2: caching identical content twice ──────────────────────────

#[tokio::test]
async fn e2e_identical_content_is_cached_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.py");
    std::fs::write(&path, "x = 1\n").unwrap();
    let mut memory = MemoryManager::new(dir.path(), &MemoryConfig::default());

    assert!(memory.cache_file_content(&path, "x = 1\n"));
    assert!(!memory.cache_file_content(&path, "x = 1\n"));
    assert_eq!(memory.recent_changes(Some(&path), 10).len(), 1);
}

// ── Scenario 3: cache bound evicts the least recently updated file ───────

#[tokio::test]
async fn e2e_cache_bound_keeps_newest_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = MemoryConfig {
        max_file_cache: 2,
        ..MemoryConfig::default()
    };
    let mut memory = MemoryManager::new(dir.path(), &config);

    let files: Vec<_> = ["f1.txt", "f2.txt", "f3.txt"]
        .iter()
        .map(|name| {
            let path = dir.path().join(name);
            std::fs::write(&path, *name).unwrap();
            path
        })
        .collect();
    for path in &files {
        memory.cache_file_content(path, &std::fs::read_to_string(path).unwrap());
    }

    assert_eq!(memory.working().cached_files(), 2);
    assert!(memory.file_content(&files[0]).is_none());
    assert_eq!(memory.file_content(&files[1]), Some("f2.txt"));
    assert_eq!(memory.file_content(&files[2]), Some("f3.txt"));
}

// ── Scenario 4: code change against a mismatching file ───────────────────

#[tokio::test]
async fn e2e_mismatched_code_change_leaves_file_alone() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("calc.py"), "def add(a, b):\n    return a + b\n").unwrap();
    let change = call(
        "apply_code_change",
        json!({ "filepath": "calc.py", "old_code": "return a - b", "new_code": "return b - a" }),
    );
    let giveup = text("The code I expected is not there.");
    let reasoner = ScriptedReasoner::new(&[change.as_str(), giveup.as_str()]);
    let mut agent = build_agent(dir.path(), reasoner.clone(), Arc::new(AutoApprove));

    let outcome = agent.run("swap the subtraction").await.unwrap();

    assert_eq!(outcome.kind, OutcomeKind::TextResponse);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("calc.py")).unwrap(),
        "def add(a, b):\n    return a + b\n"
    );
    assert!(agent.dispatcher().action_log().lock().unwrap().is_empty());

    let seen = reasoner.seen_tool_outputs.lock().unwrap().clone();
    assert_eq!(seen[0].failure_kind(), Some(FailureKind::ExecutionError));
    assert_eq!(seen[0].text(), "Old code not found in calc.py. No change applied.");
}

// ── Scenario 5: plain prose ends the task on iteration 1 ─────────────────

#[tokio::test]
async fn e2e_plain_prose_is_a_text_response() {
    let dir = tempfile::tempdir().unwrap();
    let reasoner = ScriptedReasoner::new(&["I can help with that. What file should I look at?"]);
    let mut agent = build_agent(dir.path(), reasoner.clone(), Arc::new(AutoApprove));

    let outcome = agent.run("help me").await.unwrap();

    assert_eq!(outcome.status, TaskStatus::Success);
    assert_eq!(outcome.kind, OutcomeKind::TextResponse);
    assert_eq!(outcome.iterations, 1);
    assert_eq!(outcome.message, "I can help with that. What file should I look at?");
    assert_eq!(reasoner.calls(), 1);
    assert_eq!(agent.state(), LoopState::Idle);
}

// ── Properties ───────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_denied_overwrite_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.ini"), "debug = false\n").unwrap();
    let write = call("write_file", json!({ "filepath": "config.ini", "content": "debug = true\n" }));
    let reasoner = ScriptedReasoner::new(&[write.as_str()]);
    let mut agent = build_agent(dir.path(), reasoner, Arc::new(AutoDeny));

    let outcome = agent.run("turn on debug").await.unwrap();

    assert_eq!(outcome.status, TaskStatus::Cancelled);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("config.ini")).unwrap(),
        "debug = false\n"
    );
    assert!(agent.dispatcher().action_log().lock().unwrap().is_empty());
    assert!(!dir.path().join(".codewright/backups").exists());
    assert_eq!(agent.history().last().unwrap().role, Role::UserAction);
}

#[tokio::test]
async fn e2e_code_change_undo_restores_exact_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let original = "a = 1\r\nb = 2\r\nb = 2\r\n";
    std::fs::write(dir.path().join("vals.py"), original).unwrap();
    let change = call(
        "apply_code_change",
        json!({ "filepath": "vals.py", "old_code": "b = 2", "new_code": "b = 3" }),
    );
    let done = text("Updated b.");
    let mut agent = build_agent(dir.path(), ScriptedReasoner::new(&[change.as_str(), done.as_str()]), Arc::new(AutoApprove));

    agent.run("set b to 3").await.unwrap();
    assert_eq!(
        std::fs::read_to_string(dir.path().join("vals.py")).unwrap(),
        "a = 1\r\nb = 3\r\nb = 2\r\n"
    );

    let undo = agent.dispatcher().undo().await;
    assert!(undo.is_success(), "{undo:?}");
    assert_eq!(std::fs::read(dir.path().join("vals.py")).unwrap(), original.as_bytes());

    // The backup taken before the change holds the original too
    let backups: Vec<_> = std::fs::read_dir(dir.path().join(".codewright/backups"))
        .unwrap()
        .collect();
    assert_eq!(backups.len(), 1);
}

#[tokio::test]
async fn e2e_iteration_budget_is_a_hard_bound() {
    let dir = tempfile::tempdir().unwrap();
    let list = call("list_directory_contents", json!({}));
    let replies: Vec<&str> = std::iter::repeat_n(list.as_str(), 10).collect();
    let reasoner = ScriptedReasoner::new(&replies);
    let events = Arc::new(EventBus::default());
    let mut rx = events.subscribe();
    let mut agent = build_agent(dir.path(), reasoner.clone(), Arc::new(AutoApprove)).with_events(events);

    let outcome = agent.run("keep listing").await.unwrap();

    assert_eq!(outcome.status, TaskStatus::Error);
    assert_eq!(outcome.kind, OutcomeKind::IterationBudgetExceeded);
    assert_eq!(outcome.message, "Maximum iterations (10) reached");
    assert_eq!(reasoner.calls(), 10);
    assert_eq!(agent.state(), LoopState::Idle);

    let mut completed = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(&*event, DomainEvent::TaskCompleted { .. }) {
            completed += 1;
        }
    }
    assert_eq!(completed, 1);
}

#[tokio::test]
async fn e2e_similar_project_patterns_merge() {
    let dir = tempfile::tempdir().unwrap();
    let mut memory = MemoryManager::new(dir.path(), &MemoryConfig::default());
    let first = json!({ "a": 1, "b": 2, "c": 3, "d": 4, "e": 5 });
    let second = json!({ "a": 0, "b": 0, "c": 0, "d": 0 });

    memory
        .record_project_pattern("layout", first.as_object().cloned().unwrap(), None, Default::default())
        .unwrap();
    memory
        .record_project_pattern("layout", second.as_object().cloned().unwrap(), None, Default::default())
        .unwrap();

    let patterns = memory.relevant_patterns(&Default::default(), Some("layout"));
    assert_eq!(patterns.len(), 1);
    let RelevantPattern::ProjectPattern { data, .. } = &patterns[0] else {
        panic!("expected a project pattern");
    };
    assert_eq!(data.occurrence_count, 2);
}

#[tokio::test]
async fn e2e_tool_statistics_persist_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("readme.md"), "# Project\n").unwrap();
    let read = call("read_file", json!({ "filepath": "readme.md" }));
    let missing = call("read_file", json!({ "filepath": "nope.md" }));
    let done = text("Read it.");
    let reasoner = ScriptedReasoner::new(&[read.as_str(), missing.as_str(), done.as_str()]);
    let mut agent = build_agent(dir.path(), reasoner, Arc::new(AutoApprove));

    agent.run("read the readme").await.unwrap();
    drop(agent);

    let reopened = MemoryManager::new(dir.path(), &MemoryConfig::default());
    let stats = reopened.tool_effectiveness();
    assert_eq!(stats["read_file"].total_uses, 2);
    assert_eq!(stats["read_file"].successful_uses, 1);
    assert_eq!(stats["read_file"].failed_uses, 1);
    assert!(
        reopened
            .frequently_accessed_files(5)
            .iter()
            .any(|f| f.filepath == "readme.md")
    );
}
