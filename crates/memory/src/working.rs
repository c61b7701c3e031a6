//! Working memory: session-scoped file cache and change tracking.
//!
//! Holds the content of files the assistant has seen this session, keyed by
//! path and fingerprinted with SHA-256. A cached entry is only served while
//! the file's on-disk modification time has not moved past the time seen
//! when it was cached. Alongside the cache it keeps:
//!
//! - a bounded ring of [`ChangeRecord`]s (content changes and tool operations)
//! - the set of files touched successfully this session
//! - a bounded list of recent shell commands
//! - the failures seen per file
//!
//! Nothing here is ever written to disk.

use chrono::{DateTime, Utc};
use codewright_config::MemoryConfig;
use codewright_core::memory::{ChangeRecord, ChangeType, CommandRecord, ErrorState, MemoryContext};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Stored command output is cut to this many characters.
const MAX_COMMAND_OUTPUT: usize = 500;

/// Hex-encoded SHA-256 of `content`.
pub fn fingerprint(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

// ── Data Structures ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub filepath: PathBuf,
    pub content: String,
    pub content_hash: String,
    pub size: u64,
    /// On-disk modification time when cached; `None` if the file was absent.
    pub mtime_seen: Option<SystemTime>,
    /// Monotonic update counter, breaks mtime ties during eviction.
    updated_seq: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileChangeSummary {
    pub filepath: PathBuf,
    pub total_changes: usize,
    pub change_types: BTreeMap<String, usize>,
    pub last_change: Option<ChangeRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: i64,
    pub cached_files: usize,
    pub active_files: Vec<PathBuf>,
    pub total_changes: usize,
    pub recent_commands: usize,
    pub files_with_errors: Vec<PathBuf>,
    pub working_directory: PathBuf,
}

pub struct WorkingMemory {
    working_directory: PathBuf,
    session_start: DateTime<Utc>,
    max_file_cache: usize,
    max_change_history: usize,
    max_recent_commands: usize,
    cache: HashMap<PathBuf, CacheEntry>,
    change_history: VecDeque<ChangeRecord>,
    active_files: BTreeSet<PathBuf>,
    recent_commands: VecDeque<CommandRecord>,
    error_states: BTreeMap<PathBuf, Vec<ErrorState>>,
    next_seq: u64,
}

impl WorkingMemory {
    pub fn new(working_directory: PathBuf, config: &MemoryConfig) -> Self {
        Self {
            working_directory,
            session_start: Utc::now(),
            max_file_cache: config.max_file_cache,
            max_change_history: config.max_change_history,
            max_recent_commands: config.max_recent_commands,
            cache: HashMap::new(),
            change_history: VecDeque::new(),
            active_files: BTreeSet::new(),
            recent_commands: VecDeque::new(),
            error_states: BTreeMap::new(),
            next_seq: 0,
        }
    }

    // ── File cache ────────────────────────────────────────────────────────

    /// Cache `content` for `path`. Returns whether anything changed.
    ///
    /// Identical content only catches the entry up with the file's current
    /// mtime, unless `force_refresh` is set.
    pub fn cache(&mut self, path: &Path, content: &str, force_refresh: bool) -> bool {
        let new_hash = fingerprint(content);

        if !force_refresh {
            if let Some(entry) = self.cache.get_mut(path).filter(|entry| entry.content_hash == new_hash) {
                if let Some(current) = modified_time(path) {
                    entry.mtime_seen = Some(current);
                }
                return false;
            }
        }

        let previous = self.cache.get(path);

        let old_content = previous.map(|entry| entry.content.as_str());
        let change_type = classify_change(old_content, content);
        let old_hash = previous.map(|entry| entry.content_hash.clone());

        let metadata = std::fs::metadata(path).ok();
        let entry = CacheEntry {
            filepath: path.to_path_buf(),
            content: content.to_string(),
            content_hash: new_hash.clone(),
            size: metadata.as_ref().map_or(content.len() as u64, |m| m.len()),
            mtime_seen: metadata.and_then(|m| m.modified().ok()),
            updated_seq: self.next_seq,
        };
        self.next_seq += 1;
        self.cache.insert(path.to_path_buf(), entry);

        self.push_change(ChangeRecord {
            timestamp: Utc::now(),
            filepath: path.to_path_buf(),
            operation: "content_update".into(),
            old_hash,
            new_hash: Some(new_hash),
            change_type: Some(change_type),
            success: true,
            error: None,
        });

        self.enforce_cache_bound();
        true
    }

    /// Cached content for `path`, unless the file changed on disk since.
    pub fn get(&self, path: &Path) -> Option<&str> {
        let entry = self.cache.get(path)?;
        match (modified_time(path), entry.mtime_seen) {
            (Some(current), Some(seen)) if current <= seen => Some(&entry.content),
            _ => None,
        }
    }

    pub fn hash_of(&self, path: &Path) -> Option<&str> {
        self.cache.get(path).map(|entry| entry.content_hash.as_str())
    }

    pub fn is_cached(&self, path: &Path) -> bool {
        self.cache.contains_key(path)
    }

    pub fn cached_files(&self) -> usize {
        self.cache.len()
    }

    /// Cached paths whose file moved forward on disk or disappeared.
    pub fn files_needing_refresh(&self) -> Vec<PathBuf> {
        let mut stale: Vec<PathBuf> = self
            .cache
            .values()
            .filter(|entry| match modified_time(&entry.filepath) {
                Some(current) => entry.mtime_seen.is_none_or(|seen| current > seen),
                None => true,
            })
            .map(|entry| entry.filepath.clone())
            .collect();
        stale.sort();
        stale
    }

    /// Re-read `path` from disk into the cache. A missing file is dropped.
    pub fn refresh(&mut self, path: &Path) -> bool {
        if !path.exists() {
            self.clear(Some(path));
            return false;
        }
        match std::fs::read_to_string(path) {
            Ok(content) => self.cache(path, &content, true),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to refresh cached file");
                false
            }
        }
    }

    /// Drop one cached file, or all of them.
    pub fn clear(&mut self, path: Option<&Path>) {
        match path {
            Some(path) => {
                self.cache.remove(path);
            }
            None => self.cache.clear(),
        }
    }

    fn enforce_cache_bound(&mut self) {
        while self.cache.len() > self.max_file_cache {
            let Some(oldest) = self
                .cache
                .values()
                .min_by_key(|entry| (entry.mtime_seen, entry.updated_seq))
                .map(|entry| entry.filepath.clone())
            else {
                break;
            };
            debug!(path = %oldest.display(), "Evicting cached file");
            self.cache.remove(&oldest);
        }
    }

    // ── Operations and commands ───────────────────────────────────────────

    pub fn record_file_operation(&mut self, path: &Path, operation: &str, success: bool, error: Option<&str>) {
        let now = Utc::now();
        self.push_change(ChangeRecord {
            timestamp: now,
            filepath: path.to_path_buf(),
            operation: operation.to_string(),
            old_hash: None,
            new_hash: None,
            change_type: None,
            success,
            error: error.map(str::to_string),
        });

        if success {
            self.active_files.insert(path.to_path_buf());
        } else if let Some(error) = error {
            self.error_states.entry(path.to_path_buf()).or_default().push(ErrorState {
                timestamp: now,
                operation: operation.to_string(),
                error: error.to_string(),
            });
        }
    }

    pub fn record_command(
        &mut self,
        command: &str,
        success: bool,
        output: Option<&str>,
        execution_time_ms: Option<u64>,
    ) {
        self.recent_commands.push_back(CommandRecord {
            timestamp: Utc::now(),
            command: command.to_string(),
            success,
            output: output.map(|o| o.chars().take(MAX_COMMAND_OUTPUT).collect()),
            execution_time_ms,
        });
        while self.recent_commands.len() > self.max_recent_commands {
            self.recent_commands.pop_front();
        }
    }

    fn push_change(&mut self, record: ChangeRecord) {
        self.change_history.push_back(record);
        while self.change_history.len() > self.max_change_history {
            self.change_history.pop_front();
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn change_history_len(&self) -> usize {
        self.change_history.len()
    }

    /// The last `limit` change records, optionally for one file only.
    pub fn recent_changes(&self, path: Option<&Path>, limit: usize) -> Vec<ChangeRecord> {
        let matching: Vec<&ChangeRecord> = self
            .change_history
            .iter()
            .filter(|record| path.is_none_or(|p| record.filepath == p))
            .collect();
        let skip = matching.len().saturating_sub(limit);
        matching.into_iter().skip(skip).cloned().collect()
    }

    pub fn file_change_summary(&self, path: &Path) -> FileChangeSummary {
        let changes: Vec<&ChangeRecord> = self
            .change_history
            .iter()
            .filter(|record| record.filepath == path)
            .collect();

        let mut change_types = BTreeMap::new();
        for record in &changes {
            let label = record
                .change_type
                .map(|t| t.as_str().to_string())
                .unwrap_or_else(|| record.operation.clone());
            *change_types.entry(label).or_insert(0) += 1;
        }

        FileChangeSummary {
            filepath: path.to_path_buf(),
            total_changes: changes.len(),
            change_types,
            last_change: changes.last().map(|record| (*record).clone()),
        }
    }

    pub fn active_files(&self) -> impl Iterator<Item = &Path> {
        self.active_files.iter().map(PathBuf::as_path)
    }

    pub fn recent_commands(&self) -> impl Iterator<Item = &CommandRecord> {
        self.recent_commands.iter()
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn session_summary(&self) -> SessionSummary {
        SessionSummary {
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds(),
            cached_files: self.cache.len(),
            active_files: self.active_files.iter().cloned().collect(),
            total_changes: self.change_history.len(),
            recent_commands: self.recent_commands.len(),
            files_with_errors: self.error_states.keys().cloned().collect(),
            working_directory: self.working_directory.clone(),
        }
    }

    /// The working-memory half of the reasoner's context.
    ///
    /// Persistent fields are left at their defaults for the manager to fill.
    pub fn current_context(&self) -> MemoryContext {
        let skip_ops = self.change_history.len().saturating_sub(10);
        let skip_cmds = self.recent_commands.len().saturating_sub(5);

        let error_context = self
            .error_states
            .iter()
            .filter_map(|(path, errors)| Some((path.display().to_string(), errors.last()?.clone())))
            .collect();

        MemoryContext {
            working_directory: self.working_directory.clone(),
            active_files: self.active_files.iter().cloned().collect(),
            recent_operations: self.change_history.iter().skip(skip_ops).cloned().collect(),
            recent_commands: self.recent_commands.iter().skip(skip_cmds).cloned().collect(),
            error_context,
            ..MemoryContext::default()
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn classify_change(old: Option<&str>, new: &str) -> ChangeType {
    let old = old.unwrap_or("");
    if old.is_empty() && !new.is_empty() {
        ChangeType::FileCreated
    } else if new.is_empty() {
        ChangeType::FileCleared
    } else if new.len() > old.len() {
        ChangeType::ContentAdded
    } else if new.len() < old.len() {
        ChangeType::ContentRemoved
    } else {
        ChangeType::ContentModified
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn memory_with_cache(max_file_cache: usize) -> WorkingMemory {
        let config = MemoryConfig {
            max_file_cache,
            ..MemoryConfig::default()
        };
        WorkingMemory::new(PathBuf::from("."), &config)
    }

    fn write_with_mtime(path: &Path, content: &str, mtime: SystemTime) {
        std::fs::write(path, content).unwrap();
        File::options().write(true).open(path).unwrap().set_modified(mtime).unwrap();
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        assert_eq!(
            fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(fingerprint("abc").len(), 64);
    }

    #[test]
    fn caching_identical_content_twice_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.py");
        std::fs::write(&path, "def f(): pass").unwrap();

        let mut memory = memory_with_cache(50);
        assert!(memory.cache(&path, "def f(): pass", false));
        let history = memory.change_history_len();

        assert!(!memory.cache(&path, "def f(): pass", false));
        assert_eq!(memory.change_history_len(), history);
    }

    #[test]
    fn forced_refresh_records_even_when_unchanged() {
        let mut memory = memory_with_cache(50);
        let path = Path::new("missing.py");
        memory.cache(path, "a", false);
        assert!(memory.cache(path, "a", true));
        assert_eq!(memory.change_history_len(), 2);
    }

    #[test]
    fn changes_are_classified() {
        let mut memory = memory_with_cache(50);
        let path = Path::new("c.txt");

        memory.cache(path, "abc", false);
        memory.cache(path, "abcdef", false);
        memory.cache(path, "ab", false);
        memory.cache(path, "xy", false);
        memory.cache(path, "", false);

        let types: Vec<ChangeType> = memory
            .recent_changes(Some(path), 10)
            .iter()
            .filter_map(|r| r.change_type)
            .collect();
        assert_eq!(
            types,
            vec![
                ChangeType::FileCreated,
                ChangeType::ContentAdded,
                ChangeType::ContentRemoved,
                ChangeType::ContentModified,
                ChangeType::FileCleared,
            ]
        );
    }

    #[test]
    fn eviction_drops_least_recently_updated() {
        let dir = tempfile::tempdir().unwrap();
        let base = SystemTime::now() - Duration::from_secs(60);
        let paths: Vec<PathBuf> = ["f1", "f2", "f3"].iter().map(|n| dir.path().join(n)).collect();

        let mut memory = memory_with_cache(2);
        for (i, path) in paths.iter().enumerate() {
            write_with_mtime(path, &format!("content {i}"), base + Duration::from_secs(i as u64));
            memory.cache(path, &format!("content {i}"), false);
        }

        assert_eq!(memory.cached_files(), 2);
        assert!(!memory.is_cached(&paths[0]));
        assert!(memory.is_cached(&paths[1]));
        assert!(memory.is_cached(&paths[2]));
    }

    #[test]
    fn eviction_ties_fall_back_to_update_order() {
        let mut memory = memory_with_cache(2);
        for name in ["f1", "f2", "f3"] {
            memory.cache(Path::new(name), name, false);
        }
        assert!(!memory.is_cached(Path::new("f1")));
        assert!(memory.is_cached(Path::new("f2")));
        assert!(memory.is_cached(Path::new("f3")));
    }

    #[test]
    fn stale_entries_are_not_served() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.py");
        let earlier = SystemTime::now() - Duration::from_secs(30);
        write_with_mtime(&path, "one", earlier);

        let mut memory = memory_with_cache(50);
        memory.cache(&path, "one", false);
        assert_eq!(memory.get(&path), Some("one"));
        assert!(memory.files_needing_refresh().is_empty());

        write_with_mtime(&path, "two", earlier + Duration::from_secs(10));
        assert_eq!(memory.get(&path), None);
        assert_eq!(memory.files_needing_refresh(), vec![path.clone()]);

        assert!(memory.refresh(&path));
        assert_eq!(memory.get(&path), Some("two"));
    }

    #[test]
    fn touched_but_identical_file_is_caught_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.py");
        let earlier = SystemTime::now() - Duration::from_secs(30);
        write_with_mtime(&path, "same", earlier);

        let mut memory = memory_with_cache(50);
        memory.cache(&path, "same", false);
        write_with_mtime(&path, "same", earlier + Duration::from_secs(10));
        assert_eq!(memory.files_needing_refresh(), vec![path.clone()]);

        let changes_before = memory.recent_changes(None, 100).len();
        assert!(!memory.cache(&path, "same", false));
        assert!(memory.files_needing_refresh().is_empty());
        assert_eq!(memory.get(&path), Some("same"));
        assert_eq!(memory.recent_changes(None, 100).len(), changes_before);
    }

    #[test]
    fn deleted_files_need_refresh_and_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");
        std::fs::write(&path, "bye").unwrap();

        let mut memory = memory_with_cache(50);
        memory.cache(&path, "bye", false);
        std::fs::remove_file(&path).unwrap();

        assert_eq!(memory.get(&path), None);
        assert_eq!(memory.files_needing_refresh(), vec![path.clone()]);
        assert!(!memory.refresh(&path));
        assert!(!memory.is_cached(&path));
    }

    #[test]
    fn change_ring_is_bounded() {
        let config = MemoryConfig {
            max_change_history: 3,
            ..MemoryConfig::default()
        };
        let mut memory = WorkingMemory::new(PathBuf::from("."), &config);
        for i in 0..5 {
            memory.record_file_operation(Path::new(&format!("f{i}")), "read_file", true, None);
        }
        let recent = memory.recent_changes(None, 10);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].filepath, PathBuf::from("f2"));
    }

    #[test]
    fn operations_track_active_files_and_errors() {
        let mut memory = memory_with_cache(50);
        memory.record_file_operation(Path::new("ok.py"), "write_file", true, None);
        memory.record_file_operation(Path::new("bad.py"), "read_file", false, Some("Error reading file"));

        let summary = memory.session_summary();
        assert_eq!(summary.active_files, vec![PathBuf::from("ok.py")]);
        assert_eq!(summary.files_with_errors, vec![PathBuf::from("bad.py")]);

        let context = memory.current_context();
        assert_eq!(context.error_context["bad.py"].operation, "read_file");
        assert_eq!(context.recent_operations.len(), 2);
    }

    #[test]
    fn file_change_summary_counts_types() {
        let mut memory = memory_with_cache(50);
        let path = Path::new("m.py");
        memory.cache(path, "a", false);
        memory.record_file_operation(path, "write_file", true, None);
        memory.cache(path, "ab", false);

        let summary = memory.file_change_summary(path);
        assert_eq!(summary.total_changes, 3);
        assert_eq!(summary.change_types["file_created"], 1);
        assert_eq!(summary.change_types["content_added"], 1);
        assert_eq!(summary.change_types["write_file"], 1);
    }

    #[test]
    fn commands_are_bounded_and_truncated() {
        let config = MemoryConfig {
            max_recent_commands: 2,
            ..MemoryConfig::default()
        };
        let mut memory = WorkingMemory::new(PathBuf::from("."), &config);
        let long_output = "x".repeat(2000);
        memory.record_command("ls", true, Some(&long_output), Some(5));
        memory.record_command("git status", true, None, None);
        memory.record_command("pytest", false, Some("1 failed"), None);

        let commands: Vec<&CommandRecord> = memory.recent_commands().collect();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].command, "git status");
        assert_eq!(commands[1].output.as_deref(), Some("1 failed"));

        memory.record_command("ls", true, Some(&long_output), None);
        let last = memory.recent_commands().last().unwrap();
        assert_eq!(last.output.as_ref().unwrap().len(), MAX_COMMAND_OUTPUT);
    }
}
