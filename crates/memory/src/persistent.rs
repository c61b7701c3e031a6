//! Persistent memory: durable, per-project JSON stores.
//!
//! Six independent categories, one JSON file each, under the store
//! directory injected at construction:
//!
//! | Category            | File                       |
//! |---------------------|----------------------------|
//! | file access history | `file_access_history.json` |
//! | tool effectiveness  | `tool_effectiveness.json`  |
//! | success patterns    | `success_patterns.json`    |
//! | project patterns    | `project_patterns.json`    |
//! | user preferences    | `user_preferences.json`    |
//! | code snippets       | `code_snippets.json`       |
//!
//! Every file is loaded fully into memory on creation and rewritten in full
//! on every mutation. There is no locking: one process per project.

use chrono::{DateTime, Duration, Utc};
use codewright_core::error::MemoryError;
use codewright_core::memory::{FrequentFile, ToolEffectiveness};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::similarity::{self, PATTERN_THRESHOLD, PREFERENCE_THRESHOLD};
use crate::working::fingerprint;

const MAX_OPERATIONS_PER_FILE: usize = 50;
const MAX_USAGE_CONTEXTS: usize = 20;
const MAX_SUCCESS_PATTERNS: usize = 20;
const MAX_PROJECT_PATTERNS: usize = 50;
const MAX_PREFERENCES: usize = 50;

// ── Records ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessEvent {
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAccessRecord {
    pub access_count: u64,
    #[serde(default)]
    pub operations: Vec<AccessEvent>,
    pub last_accessed: Option<DateTime<Utc>>,
    pub file_type: String,
    #[serde(default)]
    pub content_hashes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageContext {
    pub timestamp: DateTime<Utc>,
    pub context: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolStat {
    pub total_uses: u64,
    pub successful_uses: u64,
    pub failed_uses: u64,
    pub avg_execution_time_ms: f64,
    /// Normalized error text → occurrences.
    #[serde(default)]
    pub common_errors: BTreeMap<String, u64>,
    #[serde(default)]
    pub usage_contexts: Vec<UsageContext>,
    pub last_used: Option<DateTime<Utc>>,
}

impl ToolStat {
    pub fn success_rate(&self) -> f64 {
        if self.total_uses == 0 {
            0.0
        } else {
            self.successful_uses as f64 / self.total_uses as f64
        }
    }

    /// Errors by descending count, ties in key order.
    pub fn most_common_errors(&self, limit: usize) -> Vec<(String, u64)> {
        let mut errors: Vec<(String, u64)> = self
            .common_errors
            .iter()
            .map(|(error, count)| (error.clone(), *count))
            .collect();
        errors.sort_by(|a, b| b.1.cmp(&a.1));
        errors.truncate(limit);
        errors
    }

    pub fn effectiveness(&self) -> ToolEffectiveness {
        ToolEffectiveness {
            total_uses: self.total_uses,
            successful_uses: self.successful_uses,
            failed_uses: self.failed_uses,
            success_rate: self.success_rate(),
            avg_execution_time_ms: self.avg_execution_time_ms,
            common_errors: self.most_common_errors(3),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessPattern {
    pub timestamp: DateTime<Utc>,
    pub pattern_data: Map<String, Value>,
    pub success_rate: f64,
    #[serde(default)]
    pub context: Map<String, Value>,
    pub usage_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectPattern {
    pub timestamp: DateTime<Utc>,
    pub pattern_data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    #[serde(default)]
    pub context: Map<String, Value>,
    pub occurrence_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceRecord {
    pub timestamp: DateTime<Utc>,
    pub data: Map<String, Value>,
    pub confidence: f64,
    #[serde(default = "one")]
    pub occurrence_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

fn one() -> u64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSnippet {
    pub timestamp: DateTime<Utc>,
    pub snippet: String,
    pub snippet_type: String,
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    pub usage_count: u64,
    pub hash: String,
}

/// A stored pattern that applies to a query context.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelevantPattern {
    SuccessPattern { pattern_type: String, data: SuccessPattern },
    ProjectPattern { pattern_type: String, data: ProjectPattern },
}

impl RelevantPattern {
    fn weight(&self) -> u64 {
        match self {
            Self::SuccessPattern { data, .. } => data.usage_count,
            Self::ProjectPattern { data, .. } => data.occurrence_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub total: usize,
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersistentSummary {
    pub store_dir: PathBuf,
    pub project_patterns: CategorySummary,
    pub user_preferences: CategorySummary,
    pub success_patterns: CategorySummary,
    pub tool_effectiveness: CategorySummary,
    pub files_tracked: usize,
    pub total_file_accesses: u64,
    pub code_snippets: usize,
}

// ── Storage ───────────────────────────────────────────────────────────────

/// One category: its file and its in-memory contents.
struct JsonStore<T> {
    path: PathBuf,
    data: T,
}

impl<T: Serialize + DeserializeOwned + Default> JsonStore<T> {
    fn open(dir: &Path, file_name: &str) -> Self {
        let path = dir.join(file_name);
        let data = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Corrupted memory file, starting empty");
                T::default()
            }),
            // Not written yet
            Err(_) => T::default(),
        };
        Self { path, data }
    }

    fn flush(&self) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MemoryError::Storage(format!("Failed to create memory directory: {e}")))?;
        }

        let content = serde_json::to_string_pretty(&self.data)
            .map_err(|e| MemoryError::Serialization(format!("Failed to serialize {}: {e}", self.path.display())))?;

        std::fs::write(&self.path, content)
            .map_err(|e| MemoryError::Storage(format!("Failed to write {}: {e}", self.path.display())))
    }
}

pub struct PersistentMemory {
    store_dir: PathBuf,
    file_access: JsonStore<BTreeMap<String, FileAccessRecord>>,
    tool_stats: JsonStore<BTreeMap<String, ToolStat>>,
    success_patterns: JsonStore<BTreeMap<String, Vec<SuccessPattern>>>,
    project_patterns: JsonStore<BTreeMap<String, Vec<ProjectPattern>>>,
    preferences: JsonStore<BTreeMap<String, Vec<PreferenceRecord>>>,
    snippets: JsonStore<BTreeMap<String, CodeSnippet>>,
}

impl PersistentMemory {
    /// Open (or lazily create) the store rooted at `store_dir`.
    pub fn open(store_dir: PathBuf) -> Self {
        let memory = Self {
            file_access: JsonStore::open(&store_dir, "file_access_history.json"),
            tool_stats: JsonStore::open(&store_dir, "tool_effectiveness.json"),
            success_patterns: JsonStore::open(&store_dir, "success_patterns.json"),
            project_patterns: JsonStore::open(&store_dir, "project_patterns.json"),
            preferences: JsonStore::open(&store_dir, "user_preferences.json"),
            snippets: JsonStore::open(&store_dir, "code_snippets.json"),
            store_dir,
        };
        debug!(
            path = %memory.store_dir.display(),
            files = memory.file_access.data.len(),
            tools = memory.tool_stats.data.len(),
            "Persistent memory loaded"
        );
        memory
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    // ── Recording ─────────────────────────────────────────────────────────

    pub fn record_file_access(
        &mut self,
        filepath: &str,
        operation: &str,
        success: bool,
        content_hash: Option<String>,
        file_size: Option<u64>,
    ) -> Result<(), MemoryError> {
        let now = Utc::now();
        let record = self
            .file_access
            .data
            .entry(filepath.to_string())
            .or_insert_with(|| FileAccessRecord {
                access_count: 0,
                operations: Vec::new(),
                last_accessed: None,
                file_type: file_type(filepath),
                content_hashes: Vec::new(),
            });

        record.access_count += 1;
        record.last_accessed = Some(now);
        record.operations.push(AccessEvent {
            timestamp: now,
            operation: operation.to_string(),
            success,
            content_hash: content_hash.clone(),
            file_size,
        });
        keep_last(&mut record.operations, MAX_OPERATIONS_PER_FILE);

        if let Some(hash) = content_hash {
            record.content_hashes.push(hash);
            keep_last(&mut record.content_hashes, MAX_OPERATIONS_PER_FILE);
        }

        self.file_access.flush()
    }

    pub fn record_tool_usage(
        &mut self,
        tool_name: &str,
        success: bool,
        execution_time_ms: Option<u64>,
        error: Option<&str>,
        context: Option<Value>,
    ) -> Result<(), MemoryError> {
        let now = Utc::now();
        let stat = self.tool_stats.data.entry(tool_name.to_string()).or_default();

        stat.total_uses += 1;
        stat.last_used = Some(now);

        if success {
            stat.successful_uses += 1;
        } else {
            stat.failed_uses += 1;
            if let Some(error) = error {
                *stat.common_errors.entry(normalize_error(error)).or_insert(0) += 1;
            }
        }

        if let Some(elapsed) = execution_time_ms {
            let n = stat.total_uses as f64;
            stat.avg_execution_time_ms = (stat.avg_execution_time_ms * (n - 1.0) + elapsed as f64) / n;
        }

        if let Some(context) = context {
            stat.usage_contexts.push(UsageContext { timestamp: now, context });
            keep_last(&mut stat.usage_contexts, MAX_USAGE_CONTEXTS);
        }

        self.tool_stats.flush()
    }

    pub fn record_success_pattern(
        &mut self,
        pattern_type: &str,
        pattern_data: Map<String, Value>,
        success_rate: f64,
        context: Map<String, Value>,
    ) -> Result<(), MemoryError> {
        let now = Utc::now();
        let patterns = self.success_patterns.data.entry(pattern_type.to_string()).or_default();

        match patterns
            .iter_mut()
            .find(|existing| similarity::is_similar(&pattern_data, &existing.pattern_data, PATTERN_THRESHOLD))
        {
            Some(existing) => {
                existing.usage_count += 1;
                existing.success_rate = (existing.success_rate + success_rate) / 2.0;
                existing.last_used = Some(now);
            }
            None => patterns.push(SuccessPattern {
                timestamp: now,
                pattern_data,
                success_rate,
                context,
                usage_count: 1,
                last_used: None,
            }),
        }

        if patterns.len() > MAX_SUCCESS_PATTERNS {
            patterns.sort_by(|a, b| {
                b.success_rate
                    .total_cmp(&a.success_rate)
                    .then(b.usage_count.cmp(&a.usage_count))
            });
            patterns.truncate(MAX_SUCCESS_PATTERNS);
        }

        self.success_patterns.flush()
    }

    /// Record a preference observed with `confidence` in `[0, 1]`.
    pub fn record_user_preference(
        &mut self,
        preference_type: &str,
        data: Map<String, Value>,
        confidence: f64,
    ) -> Result<(), MemoryError> {
        let now = Utc::now();
        let preferences = self.preferences.data.entry(preference_type.to_string()).or_default();

        match preferences
            .iter_mut()
            .find(|existing| similarity::is_similar(&data, &existing.data, PREFERENCE_THRESHOLD))
        {
            Some(existing) => {
                existing.occurrence_count += 1;
                existing.confidence = (existing.confidence + confidence) / 2.0;
                existing.last_updated = Some(now);
            }
            None => preferences.push(PreferenceRecord {
                timestamp: now,
                data,
                confidence,
                occurrence_count: 1,
                last_updated: None,
            }),
        }

        if preferences.len() > MAX_PREFERENCES {
            preferences.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
            preferences.truncate(MAX_PREFERENCES);
        }

        self.preferences.flush()
    }

    pub fn record_project_pattern(
        &mut self,
        pattern_type: &str,
        pattern_data: Map<String, Value>,
        filepath: Option<&str>,
        context: Map<String, Value>,
    ) -> Result<(), MemoryError> {
        let now = Utc::now();
        let patterns = self.project_patterns.data.entry(pattern_type.to_string()).or_default();

        match patterns
            .iter_mut()
            .find(|existing| similarity::is_similar(&pattern_data, &existing.pattern_data, PATTERN_THRESHOLD))
        {
            Some(existing) => {
                existing.occurrence_count += 1;
                existing.last_seen = Some(now);
            }
            None => patterns.push(ProjectPattern {
                timestamp: now,
                pattern_data,
                filepath: filepath.map(str::to_string),
                context,
                occurrence_count: 1,
                last_seen: None,
            }),
        }

        if patterns.len() > MAX_PROJECT_PATTERNS {
            patterns.sort_by(|a, b| b.occurrence_count.cmp(&a.occurrence_count));
            patterns.truncate(MAX_PROJECT_PATTERNS);
        }

        self.project_patterns.flush()
    }

    /// Store a snippet keyed by its fingerprint. Returns the key.
    ///
    /// Storing the same snippet again bumps its usage count.
    pub fn store_code_snippet(
        &mut self,
        snippet: &str,
        snippet_type: &str,
        context: Map<String, Value>,
        tags: Vec<String>,
        filepath: Option<&str>,
    ) -> Result<String, MemoryError> {
        let hash = fingerprint(snippet);
        self.snippets
            .data
            .entry(hash.clone())
            .and_modify(|existing| existing.usage_count += 1)
            .or_insert_with(|| CodeSnippet {
                timestamp: Utc::now(),
                snippet: snippet.to_string(),
                snippet_type: snippet_type.to_string(),
                context,
                tags,
                filepath: filepath.map(str::to_string),
                usage_count: 0,
                hash: hash.clone(),
            });
        self.snippets.flush()?;
        Ok(hash)
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Success and project patterns whose stored context fits `context`,
    /// most used first.
    pub fn relevant_patterns(&self, context: &Map<String, Value>, pattern_type: Option<&str>) -> Vec<RelevantPattern> {
        let type_matches = |ptype: &str| pattern_type.is_none_or(|wanted| wanted == ptype);
        let mut found = Vec::new();

        for (ptype, patterns) in &self.success_patterns.data {
            if !type_matches(ptype) {
                continue;
            }
            for pattern in patterns {
                if similarity::context_matches(&pattern.context, context) {
                    found.push(RelevantPattern::SuccessPattern {
                        pattern_type: ptype.clone(),
                        data: pattern.clone(),
                    });
                }
            }
        }

        for (ptype, patterns) in &self.project_patterns.data {
            if !type_matches(ptype) {
                continue;
            }
            for pattern in patterns {
                if similarity::context_matches(&pattern.context, context) {
                    found.push(RelevantPattern::ProjectPattern {
                        pattern_type: ptype.clone(),
                        data: pattern.clone(),
                    });
                }
            }
        }

        found.sort_by_key(|pattern| std::cmp::Reverse(pattern.weight()));
        found
    }

    pub fn user_preferences(&self, preference_type: Option<&str>) -> BTreeMap<String, Vec<PreferenceRecord>> {
        self.preferences
            .data
            .iter()
            .filter(|(ptype, _)| preference_type.is_none_or(|wanted| wanted == ptype.as_str()))
            .map(|(ptype, records)| (ptype.clone(), records.clone()))
            .collect()
    }

    pub fn tool_stat(&self, tool_name: &str) -> Option<&ToolStat> {
        self.tool_stats.data.get(tool_name)
    }

    pub fn tool_effectiveness(&self) -> BTreeMap<String, ToolEffectiveness> {
        self.tool_stats
            .data
            .iter()
            .map(|(name, stat)| (name.clone(), stat.effectiveness()))
            .collect()
    }

    pub fn file_access(&self, filepath: &str) -> Option<&FileAccessRecord> {
        self.file_access.data.get(filepath)
    }

    pub fn frequently_accessed_files(&self, limit: usize) -> Vec<FrequentFile> {
        let mut files: Vec<FrequentFile> = self
            .file_access
            .data
            .iter()
            .map(|(path, record)| FrequentFile {
                filepath: path.clone(),
                access_count: record.access_count,
                last_accessed: record.last_accessed,
                file_type: record.file_type.clone(),
            })
            .collect();
        files.sort_by_key(|file| std::cmp::Reverse(file.access_count));
        files.truncate(limit);
        files
    }

    pub fn search_code_snippets(
        &self,
        query: Option<&str>,
        snippet_type: Option<&str>,
        tags: &[String],
    ) -> Vec<&CodeSnippet> {
        let query = query.map(str::to_lowercase);
        let mut results: Vec<&CodeSnippet> = self
            .snippets
            .data
            .values()
            .filter(|s| snippet_type.is_none_or(|t| s.snippet_type == t))
            .filter(|s| tags.is_empty() || tags.iter().any(|tag| s.tags.contains(tag)))
            .filter(|s| query.as_ref().is_none_or(|q| s.snippet.to_lowercase().contains(q)))
            .collect();
        results.sort_by_key(|s| std::cmp::Reverse(s.usage_count));
        results
    }

    pub fn summary(&self) -> PersistentSummary {
        fn category<T>(map: &BTreeMap<String, Vec<T>>) -> CategorySummary {
            CategorySummary {
                total: map.values().map(Vec::len).sum(),
                types: map.keys().cloned().collect(),
            }
        }

        PersistentSummary {
            store_dir: self.store_dir.clone(),
            project_patterns: category(&self.project_patterns.data),
            user_preferences: category(&self.preferences.data),
            success_patterns: category(&self.success_patterns.data),
            tool_effectiveness: CategorySummary {
                total: self.tool_stats.data.len(),
                types: self.tool_stats.data.keys().cloned().collect(),
            },
            files_tracked: self.file_access.data.len(),
            total_file_accesses: self.file_access.data.values().map(|r| r.access_count).sum(),
            code_snippets: self.snippets.data.len(),
        }
    }

    // ── Maintenance ───────────────────────────────────────────────────────

    /// Prune access events and usage contexts older than `days_old` days.
    ///
    /// Parent entries and their counters are kept. Returns how many
    /// sub-records were removed.
    pub fn cleanup(&mut self, days_old: u32) -> Result<usize, MemoryError> {
        let cutoff = Utc::now() - Duration::days(i64::from(days_old));
        let mut pruned_access = 0;
        for record in self.file_access.data.values_mut() {
            let before = record.operations.len();
            record.operations.retain(|event| event.timestamp > cutoff);
            pruned_access += before - record.operations.len();
        }

        let mut pruned_usage = 0;
        for stat in self.tool_stats.data.values_mut() {
            let before = stat.usage_contexts.len();
            stat.usage_contexts.retain(|usage| usage.timestamp > cutoff);
            pruned_usage += before - stat.usage_contexts.len();
        }

        if pruned_access > 0 {
            self.file_access.flush()?;
        }
        if pruned_usage > 0 {
            self.tool_stats.flush()?;
        }

        let removed = pruned_access + pruned_usage;
        if removed > 0 {
            debug!(removed, days_old, "Pruned old memory records");
        }
        Ok(removed)
    }
}

fn keep_last<T>(items: &mut Vec<T>, max: usize) {
    if items.len() > max {
        items.drain(..items.len() - max);
    }
}

/// Error text up to the first `:`, trimmed.
fn normalize_error(error: &str) -> String {
    error.split(':').next().unwrap_or(error).trim().to_string()
}

/// Lower-cased extension with its dot, or `unknown`.
pub(crate) fn file_type(filepath: &str) -> String {
    Path::new(filepath)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_else(|| "unknown".into())
}

// ── Tests ─────────────────────────────────────────────────────────────────
