//! Configuration loading, validation, and management for codewright.
//!
//! Loads configuration from `~/.codewright/config.toml` with environment
//! variable overrides. Locations that depend on the project being worked on
//! (the persistent memory store, backups) are resolved against a project
//! root passed in by the caller, never from process-wide state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the per-project hidden directory.
pub const PROJECT_DIR_NAME: &str = ".codewright";

/// The root configuration structure.
///
/// Maps directly to `~/.codewright/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default reasoning provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per reasoning reply
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Control loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Working and persistent memory settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Tool behavior
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    4096
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("agent", &self.agent)
            .field("memory", &self.memory)
            .field("tools", &self.tools)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Hard cap on perceive/reason/act rounds per request
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Run session learning every N iterations
    #[serde(default = "default_learn_every")]
    pub learn_every: u32,
}

fn default_max_iterations() -> u32 {
    10
}
fn default_learn_every() -> u32 {
    10
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            learn_every: default_learn_every(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Persistent store directory; defaults to `<project>/.codewright/memory`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,

    #[serde(default = "default_max_file_cache")]
    pub max_file_cache: usize,

    #[serde(default = "default_max_change_history")]
    pub max_change_history: usize,

    #[serde(default = "default_max_recent_commands")]
    pub max_recent_commands: usize,

    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Age after which access and usage sub-records are pruned
    #[serde(default = "default_cleanup_days")]
    pub cleanup_days: u32,
}

fn default_max_file_cache() -> usize {
    50
}
fn default_max_change_history() -> usize {
    100
}
fn default_max_recent_commands() -> usize {
    50
}
fn default_sync_interval_secs() -> u64 {
    60
}
fn default_cleanup_days() -> u32 {
    30
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            store_dir: None,
            max_file_cache: default_max_file_cache(),
            max_change_history: default_max_change_history(),
            max_recent_commands: default_max_recent_commands(),
            sync_interval_secs: default_sync_interval_secs(),
            cleanup_days: default_cleanup_days(),
        }
    }
}

impl MemoryConfig {
    /// Where the persistent store lives for `project_root`.
    pub fn store_path(&self, project_root: &Path) -> PathBuf {
        match &self.store_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => project_root.join(dir),
            None => project_root.join(PROJECT_DIR_NAME).join("memory"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Copy files aside before destructive operations
    #[serde(default = "default_true")]
    pub backups: bool,

    /// Backup directory; defaults to `<project>/.codewright/backups`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,

    #[serde(default = "default_linter_command")]
    pub linter_command: String,

    #[serde(default = "default_test_command")]
    pub test_command: String,
}

fn default_true() -> bool {
    true
}
fn default_linter_command() -> String {
    "pylint".into()
}
fn default_test_command() -> String {
    "pytest".into()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            backups: true,
            backup_dir: None,
            linter_command: default_linter_command(),
            test_command: default_test_command(),
        }
    }
}

impl ToolsConfig {
    /// Backup directory for `project_root`, or `None` when backups are off.
    pub fn backup_path(&self, project_root: &Path) -> Option<PathBuf> {
        if !self.backups {
            return None;
        }
        Some(match &self.backup_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => project_root.join(dir),
            None => project_root.join(PROJECT_DIR_NAME).join("backups"),
        })
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.codewright/config.toml).
    ///
    /// Environment overrides:
    /// - `CODEWRIGHT_API_KEY`, then `OPENROUTER_API_KEY`, then `OPENAI_API_KEY`
    /// - `CODEWRIGHT_PROVIDER`, `CODEWRIGHT_MODEL`
    /// - `CODEWRIGHT_MAX_ITERATIONS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if self.api_key.is_none() {
            self.api_key = std::env::var("CODEWRIGHT_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("CODEWRIGHT_PROVIDER") {
            self.default_provider = provider;
        }

        if let Ok(model) = std::env::var("CODEWRIGHT_MODEL") {
            self.default_model = model;
        }

        if let Ok(raw) = std::env::var("CODEWRIGHT_MAX_ITERATIONS") {
            self.agent.max_iterations = raw.parse().map_err(|_| {
                ConfigError::ValidationError(format!("CODEWRIGHT_MAX_ITERATIONS is not a number: {raw}"))
            })?;
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(PROJECT_DIR_NAME)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError("agent.max_iterations must be > 0".into()));
        }

        if self.agent.learn_every == 0 {
            return Err(ConfigError::ValidationError("agent.learn_every must be > 0".into()));
        }

        if self.memory.max_file_cache == 0 || self.memory.max_change_history == 0 {
            return Err(ConfigError::ValidationError(
                "memory.max_file_cache and memory.max_change_history must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            agent: AgentConfig::default(),
            memory: MemoryConfig::default(),
            tools: ToolsConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
