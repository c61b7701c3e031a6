//! Shell tools: `run_command` and `run_git_command`.
//!
//! `run_command` goes through the platform shell. `run_git_command` spawns
//! `git` directly with split arguments, so shell syntax in its input is
//! passed to git literally. Both run in the project root.

use async_trait::async_trait;
use codewright_core::approval::{Preview, PreviewKind};
use codewright_core::error::ToolError;
use codewright_core::tool::{Tool, ToolOutput};
use std::path::Path;
use std::process::Output;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::workspace::{Workspace, required_str};

/// A platform shell invocation of `command` in `cwd`.
pub(crate) fn shell_command(command: &str, cwd: &Path) -> Command {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };
    cmd.current_dir(cwd);
    cmd
}

/// Render captured output the way the reasoner sees it.
pub(crate) fn format_output(output: &Output) -> String {
    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let (stdout, stderr) = (stdout.trim(), stderr.trim());

    match (stdout.is_empty(), stderr.is_empty()) {
        (false, false) => format!("Exit Code: {code}\nSTDOUT:\n{stdout}\nSTDERR:\n{stderr}"),
        (false, true) => format!("Exit Code: {code}\nSTDOUT:\n{stdout}"),
        (true, false) => format!("Exit Code: {code}\nSTDERR:\n{stderr}"),
        (true, true) => format!("Command executed successfully with no output. Exit Code: {code}"),
    }
}

/// Run `cmd` and report any exit code as a successful call.
pub(crate) async fn run_reported(tool_name: &str, command: &str, mut cmd: Command) -> Result<ToolOutput, ToolError> {
    debug!(tool = %tool_name, command = %command, "Executing shell command");

    let output = cmd.output().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            let program = command.split_whitespace().next().unwrap_or(command);
            ToolError::failed(
                tool_name,
                format!("Command not found: '{program}'. Make sure it is installed and in your PATH."),
            )
        } else {
            ToolError::failed(tool_name, e.to_string())
        }
    })?;

    if !output.status.success() {
        warn!(command = %command, exit_code = output.status.code().unwrap_or(-1), "Command exited non-zero");
    }

    Ok(ToolOutput::text(format_output(&output)))
}

// ── run_command ───────────────────────────────────────────────────────────

pub struct RunCommandTool {
    workspace: Arc<Workspace>,
}

impl RunCommandTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Runs any shell command and returns its standard output and standard error."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute."
                }
            },
            "required": ["command"]
        })
    }

    fn command_line(&self, arguments: &serde_json::Value) -> Option<String> {
        arguments["command"].as_str().map(str::to_string)
    }

    fn preview(&self, arguments: &serde_json::Value) -> Option<Preview> {
        let command = arguments["command"].as_str()?;
        Some(Preview::new(command, PreviewKind::Bash))
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let command = required_str(&arguments, "command")?;
        run_reported(self.name(), command, shell_command(command, self.workspace.root())).await
    }
}

// ── run_git_command ───────────────────────────────────────────────────────

pub struct RunGitCommandTool {
    workspace: Arc<Workspace>,
}

impl RunGitCommandTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    /// `status` and `git status` both become `git status`.
    fn full_command(command: &str) -> String {
        let command = command.trim();
        let args = command.strip_prefix("git ").unwrap_or(command);
        format!("git {}", args.trim_start())
    }

    /// Arguments for the `git` process, split with shell quoting rules.
    fn git_args(command: &str) -> Result<Vec<String>, ToolError> {
        let mut args = shlex::split(command)
            .ok_or_else(|| ToolError::InvalidArguments(format!("Unbalanced quotes in git command: {command}")))?;
        if args.first().is_some_and(|first| first == "git") {
            args.remove(0);
        }
        if args.is_empty() {
            return Err(ToolError::InvalidArguments("Empty git command".into()));
        }
        Ok(args)
    }
}

#[async_trait]
impl Tool for RunGitCommandTool {
    fn name(&self) -> &str {
        "run_git_command"
    }

    fn description(&self) -> &str {
        "Runs a git command (e.g. 'status', 'diff', 'log -n 5') and returns its output."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The git subcommand and its arguments."
                }
            },
            "required": ["command"]
        })
    }

    fn command_line(&self, arguments: &serde_json::Value) -> Option<String> {
        arguments["command"].as_str().map(Self::full_command)
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let raw = required_str(&arguments, "command")?;
        let args = Self::git_args(raw)?;

        debug!(command = %Self::full_command(raw), "Executing git command");
        let output = Command::new("git")
            .args(&args)
            .current_dir(self.workspace.root())
            .output()
            .await
            .map_err(|e| ToolError::failed(self.name(), e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::failed(
                self.name(),
                format!("Git command failed: {}", stderr.trim()),
            ));
        }

        Ok(ToolOutput::text(String::from_utf8_lossy(&output.stdout).trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> (tempfile::TempDir, Arc<Workspace>) {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Arc::new(Workspace::new(dir.path()));
        (dir, workspace)
    }

    #[tokio::test]
    async fn echo_reports_stdout() {
        let (_dir, workspace) = workspace();
        let output = RunCommandTool::new(workspace)
            .execute(serde_json::json!({ "command": "echo hello" }))
            .await
            .unwrap();
        assert_eq!(output.content, "Exit Code: 0\nSTDOUT:\nhello");
    }

    #[tokio::test]
    async fn non_zero_exit_is_still_success() {
        let (_dir, workspace) = workspace();
        let output = RunCommandTool::new(workspace)
            .execute(serde_json::json!({ "command": "exit 3" }))
            .await
            .unwrap();
        assert_eq!(output.content, "Command executed successfully with no output. Exit Code: 3");
    }

    #[tokio::test]
    async fn runs_in_project_root() {
        let (dir, workspace) = workspace();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let output = RunCommandTool::new(workspace)
            .execute(serde_json::json!({ "command": "ls" }))
            .await
            .unwrap();
        assert!(output.content.contains("marker.txt"));
    }

    #[test]
    fn command_line_and_preview() {
        let tool = RunCommandTool::new(Arc::new(Workspace::new("/")));
        let args = serde_json::json!({ "command": "pytest -q" });
        assert_eq!(tool.command_line(&args).as_deref(), Some("pytest -q"));
        assert_eq!(tool.preview(&args).unwrap().kind, PreviewKind::Bash);
    }

    #[test]
    fn git_prefix_is_normalized() {
        assert_eq!(RunGitCommandTool::full_command("status"), "git status");
        assert_eq!(RunGitCommandTool::full_command("git log -n 5"), "git log -n 5");
    }

    #[test]
    fn git_args_keep_quoted_words_together() {
        assert_eq!(
            RunGitCommandTool::git_args("git commit -m \"fix the parser\"").unwrap(),
            vec!["commit", "-m", "fix the parser"]
        );
        assert_eq!(RunGitCommandTool::git_args("log --oneline").unwrap(), vec!["log", "--oneline"]);
        assert!(RunGitCommandTool::git_args("commit -m \"open").is_err());
        assert!(RunGitCommandTool::git_args("git").is_err());
    }

    #[tokio::test]
    async fn git_input_is_not_interpreted_by_a_shell() {
        let (dir, workspace) = workspace();
        let keep = dir.path().join("keep.py");
        std::fs::write(&keep, "x = 1").unwrap();

        let _ = RunGitCommandTool::new(workspace)
            .execute(serde_json::json!({ "command": "--version; rm keep.py" }))
            .await;
        assert!(keep.exists());
    }

    #[tokio::test]
    async fn git_failure_is_an_error() {
        let (_dir, workspace) = workspace();
        let err = RunGitCommandTool::new(workspace)
            .execute(serde_json::json!({ "command": "definitely-not-a-subcommand" }))
            .await
            .unwrap_err();
        assert!(err.message().starts_with("Git command failed:"));
    }
}
