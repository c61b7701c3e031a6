//! Confirmation gate for destructive operations.
//!
//! The dispatcher asks an [`Approver`] before running anything that can
//! modify the project. The CLI prompts on the terminal; the two unit
//! approvers here serve non-interactive runs and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How preview content should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewKind {
    Text,
    Bash,
    Diff,
}

impl PreviewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Bash => "bash",
            Self::Diff => "diff",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preview {
    pub content: String,
    pub kind: PreviewKind,
}

impl Preview {
    pub fn new(content: impl Into<String>, kind: PreviewKind) -> Self {
        Self {
            content: content.into(),
            kind,
        }
    }
}

/// A pending destructive call awaiting a yes/no answer.
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    pub tool_name: String,
    pub description: String,
    pub preview: Option<Preview>,
}

#[async_trait]
pub trait Approver: Send + Sync {
    /// Returns `true` to let the call proceed.
    async fn confirm(&self, request: &ApprovalRequest) -> bool;
}

/// Approves everything (`--yes`).
pub struct AutoApprove;

#[async_trait]
impl Approver for AutoApprove {
    async fn confirm(&self, _request: &ApprovalRequest) -> bool {
        true
    }
}

/// Denies everything.
pub struct AutoDeny;

#[async_trait]
impl Approver for AutoDeny {
    async fn confirm(&self, _request: &ApprovalRequest) -> bool {
        false
    }
}
