//! Error types for the codewright domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

use crate::tool::FailureKind;

/// The top-level error type for all codewright operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Reasoning errors ---
    #[error("Reasoning error: {0}")]
    Reasoning(#[from] ReasoningError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- I/O ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ReasoningError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Reasoner not configured: {0}")]
    NotConfigured(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Failures raised while executing a tool.
///
/// The dispatcher never lets these escape: each one is folded into a
/// [`ToolOutcome::Failure`](crate::tool::ToolOutcome) carrying its
/// [`FailureKind`].
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Backup of {path} failed: {reason}")]
    BackupFailed { path: String, reason: String },

    #[error("{0}")]
    Undo(String),
}

impl ToolError {
    /// Construct an execution failure for `tool_name`.
    pub fn failed(tool_name: &str, reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            tool_name: tool_name.to_string(),
            reason: reason.into(),
        }
    }

    /// The machine-checkable kind reported in tool results.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound(_) => FailureKind::ToolNotFound,
            Self::InvalidArguments(_) => FailureKind::ArgumentError,
            Self::ExecutionFailed { .. } | Self::BackupFailed { .. } => FailureKind::ExecutionError,
            Self::Undo(_) => FailureKind::UndoError,
        }
    }

    /// The message shown to the reasoner, without the error-kind prefix
    /// for failures whose text is already user-facing.
    pub fn message(&self) -> String {
        match self {
            Self::ExecutionFailed { reason, .. } => reason.clone(),
            Self::Undo(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}
