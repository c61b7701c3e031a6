//! Memory manager: one facade over working and persistent memory.
//!
//! The control loop and the tools only talk to this type. It builds the
//! merged [`MemoryContext`] for the reasoner, runs periodic sync, and turns
//! session activity into durable patterns.

use chrono::{DateTime, Utc};
use codewright_config::MemoryConfig;
use codewright_core::error::MemoryError;
use codewright_core::memory::{ChangeRecord, FrequentFile, MemoryContext, ToolEffectiveness};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::persistent::{CodeSnippet, PersistentMemory, PersistentSummary, PreferenceRecord, RelevantPattern};
use crate::working::{FileChangeSummary, SessionSummary, WorkingMemory};

/// The manager as shared between the loop, the dispatcher and tools.
pub type SharedMemory = Arc<Mutex<MemoryManager>>;

/// Files listed under `frequently_accessed_files` in the context.
const CONTEXT_FREQUENT_FILES: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct MemorySummary {
    pub session_id: String,
    pub session: SessionSummary,
    pub persistent: PersistentSummary,
    pub last_sync: DateTime<Utc>,
}

pub struct MemoryManager {
    working: WorkingMemory,
    persistent: PersistentMemory,
    project_root: PathBuf,
    session_id: String,
    sync_interval: Duration,
    cleanup_days: u32,
    last_sync: Instant,
    last_sync_at: DateTime<Utc>,
}

impl MemoryManager {
    /// Open memory for the project at `project_root`.
    pub fn new(project_root: &Path, config: &MemoryConfig) -> Self {
        let store_dir = config.store_path(project_root);
        let manager = Self {
            working: WorkingMemory::new(project_root.to_path_buf(), config),
            persistent: PersistentMemory::open(store_dir),
            project_root: project_root.to_path_buf(),
            session_id: new_session_id(),
            sync_interval: Duration::from_secs(config.sync_interval_secs),
            cleanup_days: config.cleanup_days,
            last_sync: Instant::now(),
            last_sync_at: Utc::now(),
        };
        info!(session = %manager.session_id, root = %project_root.display(), "Memory session started");
        manager
    }

    pub fn shared(self) -> SharedMemory {
        Arc::new(Mutex::new(self))
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn working(&self) -> &WorkingMemory {
        &self.working
    }

    pub fn persistent(&self) -> &PersistentMemory {
        &self.persistent
    }

    /// Key under which `path` is stored persistently: relative to the
    /// project root when possible.
    fn store_key(&self, path: &Path) -> String {
        path.strip_prefix(&self.project_root)
            .unwrap_or(path)
            .display()
            .to_string()
    }

    // ── File content ──────────────────────────────────────────────────────

    pub fn cache_file_content(&mut self, path: &Path, content: &str) -> bool {
        self.working.cache(path, content, false)
    }

    pub fn file_content(&self, path: &Path) -> Option<&str> {
        self.working.get(path)
    }

    pub fn forget_file(&mut self, path: &Path) {
        self.working.clear(Some(path));
    }

    pub fn refresh_file(&mut self, path: &Path) -> bool {
        self.working.refresh(path)
    }

    pub fn files_needing_refresh(&self) -> Vec<PathBuf> {
        self.working.files_needing_refresh()
    }

    // ── Recording ─────────────────────────────────────────────────────────

    /// Record a file operation in both tiers.
    pub fn record_file_operation(&mut self, path: &Path, operation: &str, success: bool, error: Option<&str>) {
        self.working.record_file_operation(path, operation, success, error);

        let (hash, size) = match (success, self.working.get(path)) {
            (true, Some(content)) => (self.working.hash_of(path).map(str::to_string), Some(content.len() as u64)),
            _ => (None, None),
        };

        let key = self.store_key(path);
        if let Err(e) = self.persistent.record_file_access(&key, operation, success, hash, size) {
            warn!(path = %key, error = %e, "Failed to record file access");
        }
    }

    pub fn record_tool_usage(
        &mut self,
        tool_name: &str,
        success: bool,
        execution_time_ms: Option<u64>,
        error: Option<&str>,
        context: Option<Value>,
    ) {
        if let Err(e) = self
            .persistent
            .record_tool_usage(tool_name, success, execution_time_ms, error, context)
        {
            warn!(tool = %tool_name, error = %e, "Failed to record tool usage");
        }
    }

    pub fn record_command(&mut self, command: &str, success: bool, output: Option<&str>, execution_time_ms: Option<u64>) {
        self.working.record_command(command, success, output, execution_time_ms);
    }

    pub fn record_success_pattern(
        &mut self,
        pattern_type: &str,
        pattern_data: Map<String, Value>,
        success_rate: f64,
        context: Map<String, Value>,
    ) -> Result<(), MemoryError> {
        self.persistent
            .record_success_pattern(pattern_type, pattern_data, success_rate, context)
    }

    pub fn record_user_preference(&mut self, preference_type: &str, data: Map<String, Value>) -> Result<(), MemoryError> {
        self.persistent.record_user_preference(preference_type, data, 1.0)
    }

    pub fn record_project_pattern(
        &mut self,
        pattern_type: &str,
        pattern_data: Map<String, Value>,
        filepath: Option<&Path>,
        context: Map<String, Value>,
    ) -> Result<(), MemoryError> {
        let key = filepath.map(|p| self.store_key(p));
        self.persistent
            .record_project_pattern(pattern_type, pattern_data, key.as_deref(), context)
    }

    pub fn store_code_snippet(
        &mut self,
        snippet: &str,
        snippet_type: &str,
        context: Map<String, Value>,
        tags: Vec<String>,
        filepath: Option<&Path>,
    ) -> Result<String, MemoryError> {
        let key = filepath.map(|p| self.store_key(p));
        self.persistent
            .store_code_snippet(snippet, snippet_type, context, tags, key.as_deref())
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn relevant_patterns(&self, context: &Map<String, Value>, pattern_type: Option<&str>) -> Vec<RelevantPattern> {
        self.persistent.relevant_patterns(context, pattern_type)
    }

    pub fn user_preferences(&self, preference_type: Option<&str>) -> BTreeMap<String, Vec<PreferenceRecord>> {
        self.persistent.user_preferences(preference_type)
    }

    pub fn tool_effectiveness(&self) -> BTreeMap<String, ToolEffectiveness> {
        self.persistent.tool_effectiveness()
    }

    pub fn frequently_accessed_files(&self, limit: usize) -> Vec<FrequentFile> {
        self.persistent.frequently_accessed_files(limit)
    }

    pub fn search_code_snippets(&self, query: Option<&str>, snippet_type: Option<&str>, tags: &[String]) -> Vec<&CodeSnippet> {
        self.persistent.search_code_snippets(query, snippet_type, tags)
    }

    pub fn recent_changes(&self, path: Option<&Path>, limit: usize) -> Vec<ChangeRecord> {
        self.working.recent_changes(path, limit)
    }

    pub fn file_change_summary(&self, path: &Path) -> FileChangeSummary {
        self.working.file_change_summary(path)
    }

    pub fn session_summary(&self) -> SessionSummary {
        self.working.session_summary()
    }

    /// The merged context handed to the reasoner.
    pub fn current_context(&self) -> MemoryContext {
        let user_preferences = self
            .persistent
            .user_preferences(None)
            .into_iter()
            .filter_map(|(ptype, records)| Some((ptype, serde_json::to_value(records).ok()?)))
            .collect();

        MemoryContext {
            session_id: self.session_id.clone(),
            frequently_accessed_files: self.persistent.frequently_accessed_files(CONTEXT_FREQUENT_FILES),
            tool_effectiveness: self.persistent.tool_effectiveness(),
            user_preferences,
            ..self.working.current_context()
        }
    }

    pub fn memory_summary(&self) -> MemorySummary {
        MemorySummary {
            session_id: self.session_id.clone(),
            session: self.working.session_summary(),
            persistent: self.persistent.summary(),
            last_sync: self.last_sync_at,
        }
    }

    // ── Maintenance ───────────────────────────────────────────────────────

    /// Refresh stale cache entries and prune old persistent records.
    ///
    /// Without `force` this runs at most once per sync interval. Returns the
    /// number of refreshed files when it ran.
    pub fn sync(&mut self, force: bool) -> Option<usize> {
        if !force && self.last_sync.elapsed() < self.sync_interval {
            return None;
        }

        let stale = self.working.files_needing_refresh();
        for path in &stale {
            self.working.refresh(path);
        }

        if let Err(e) = self.persistent.cleanup(self.cleanup_days) {
            warn!(error = %e, "Memory cleanup failed");
        }

        self.last_sync = Instant::now();
        self.last_sync_at = Utc::now();
        debug!(refreshed = stale.len(), "Memory synced");
        Some(stale.len())
    }

    /// Turn this session's activity into durable patterns and preferences.
    pub fn learn_from_session(&mut self) {
        let session_context = json_map(json!({ "session_id": self.session_id }));

        let active: Vec<PathBuf> = self.working.active_files().map(Path::to_path_buf).collect();
        for path in active {
            let summary = self.working.file_change_summary(&path);
            if summary.total_changes == 0 {
                continue;
            }
            let data = json_map(json!({
                "file_type": extension_label(&path),
                "change_count": summary.total_changes,
                "change_types": summary.change_types,
            }));
            if let Err(e) =
                self.record_project_pattern("file_modification_pattern", data, Some(&path), session_context.clone())
            {
                warn!(path = %path.display(), error = %e, "Failed to record file pattern");
            }
        }

        #[derive(Default)]
        struct CommandStats {
            count: u64,
            succeeded: u64,
            examples: Vec<String>,
        }

        let mut by_category: BTreeMap<&'static str, CommandStats> = BTreeMap::new();
        for record in self.working.recent_commands() {
            let stats = by_category.entry(categorize_command(&record.command)).or_default();
            stats.count += 1;
            if record.success {
                stats.succeeded += 1;
            }
            if stats.examples.len() < 3 {
                stats.examples.push(record.command.clone());
            }
        }

        for (category, stats) in by_category {
            let data = json_map(json!({
                "command_type": category,
                "frequency": stats.count,
                "success_rate": stats.succeeded as f64 / stats.count as f64,
                "example_commands": stats.examples,
            }));
            if let Err(e) = self.persistent.record_user_preference("command_patterns", data, 1.0) {
                warn!(category, error = %e, "Failed to record command preference");
            }
        }
    }
}

/// Bucket a shell command by simple prefix and keyword rules.
pub fn categorize_command(command: &str) -> &'static str {
    let command = command.trim().to_lowercase();
    let starts = |prefixes: &[&str]| prefixes.iter().any(|p| command.starts_with(p));

    if starts(&["git "]) {
        "git_operation"
    } else if starts(&["python ", "python3 "]) {
        "python_execution"
    } else if starts(&["pip "]) {
        "package_management"
    } else if starts(&["ls ", "dir "]) {
        "file_listing"
    } else if starts(&["cd "]) {
        "directory_navigation"
    } else if command.contains("test") {
        "testing"
    } else if command.contains("lint") {
        "code_analysis"
    } else {
        "general_command"
    }
}

fn new_session_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("session_{}_{}", Utc::now().timestamp(), &suffix[..8])
}

fn extension_label(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_else(|| "no_extension".into())
}

fn json_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(root: &Path) -> MemoryManager {
        MemoryManager::new(root, &MemoryConfig::default())
    }

    #[test]
    fn session_id_has_timestamp_and_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        let parts: Vec<&str> = manager.session_id().split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "session");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 8);
    }

    #[test]
    fn store_defaults_to_hidden_project_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager(dir.path());
        manager.record_tool_usage("read_file", true, Some(3), None, None);
        assert!(dir.path().join(".codewright/memory/tool_effectiveness.json").exists());
    }

    #[test]
    fn file_operations_reach_both_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.py");
        std::fs::write(&path, "print(1)").unwrap();

        let mut manager = manager(dir.path());
        manager.cache_file_content(&path, "print(1)");
        manager.record_file_operation(&path, "read_file", true, None);

        let record = manager.persistent().file_access("a.py").unwrap();
        assert_eq!(record.access_count, 1);
        assert_eq!(record.content_hashes.len(), 1);

        let context = manager.current_context();
        assert_eq!(context.active_files, vec![path.clone()]);
        assert_eq!(context.frequently_accessed_files[0].filepath, "a.py");
        assert_eq!(context.session_id, manager.session_id());
    }

    #[test]
    fn sync_is_rate_limited_unless_forced() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager(dir.path());
        assert_eq!(manager.sync(false), None);
        assert_eq!(manager.sync(true), Some(0));
    }

    #[test]
    fn sync_refreshes_stale_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");
        std::fs::write(&path, "x").unwrap();

        let config = MemoryConfig {
            sync_interval_secs: 0,
            ..MemoryConfig::default()
        };
        let mut manager = MemoryManager::new(dir.path(), &config);
        manager.cache_file_content(&path, "x");
        std::fs::remove_file(&path).unwrap();

        assert_eq!(manager.sync(false), Some(1));
        assert!(manager.files_needing_refresh().is_empty());
    }

    #[test]
    fn learning_records_file_and_command_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.py");
        std::fs::write(&path, "a = 1").unwrap();

        let mut manager = manager(dir.path());
        manager.cache_file_content(&path, "a = 1");
        manager.record_file_operation(&path, "write_file", true, None);
        manager.record_command("git status", true, None, None);
        manager.record_command("git diff", false, None, None);
        manager.record_command("pytest -q", true, None, None);

        manager.learn_from_session();

        let patterns = manager.relevant_patterns(&Map::new(), Some("file_modification_pattern"));
        assert_eq!(patterns.len(), 1);
        match &patterns[0] {
            RelevantPattern::ProjectPattern { data, .. } => {
                assert_eq!(data.filepath.as_deref(), Some("m.py"));
                assert_eq!(data.pattern_data["file_type"], ".py");
                assert_eq!(data.pattern_data["change_count"], 2);
            }
            other => panic!("unexpected pattern {other:?}"),
        }

        // Same key set for every category, so they merge into one record.
        let prefs = manager.user_preferences(Some("command_patterns"));
        let records = &prefs["command_patterns"];
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].occurrence_count, 2);
    }

    #[test]
    fn commands_are_categorized() {
        assert_eq!(categorize_command("git commit -m x"), "git_operation");
        assert_eq!(categorize_command("python3 main.py"), "python_execution");
        assert_eq!(categorize_command("pip install requests"), "package_management");
        assert_eq!(categorize_command("ls -la"), "file_listing");
        assert_eq!(categorize_command("cd src"), "directory_navigation");
        assert_eq!(categorize_command("pytest tests/"), "testing");
        assert_eq!(categorize_command("pylint app.py"), "code_analysis");
        assert_eq!(categorize_command("echo hi"), "general_command");
    }

    #[test]
    fn summary_reports_both_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager(dir.path());
        manager.record_tool_usage("run_command", false, None, Some("boom: details"), None);

        let summary = manager.memory_summary();
        assert_eq!(summary.session_id, manager.session_id());
        assert_eq!(summary.persistent.tool_effectiveness.types, vec!["run_command".to_string()]);
        assert_eq!(summary.session.cached_files, 0);
        assert!(serde_json::to_value(&summary).is_ok());
    }
}
