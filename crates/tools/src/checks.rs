//! `run_linter` and `run_tests`: project checks with configurable commands.
//!
//! The configured command is split with shell quoting rules and spawned
//! directly; the target path is passed as its own argument. The project root
//! is exported as `PYTHONPATH` so the default Python tooling resolves local
//! imports.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{Tool, ToolOutput};
use std::sync::Arc;
use tokio::process::Command;

use crate::shell::run_reported;
use crate::workspace::{Workspace, optional_str};

/// Program and arguments of a configured check plus its optional target.
fn check_argv(tool_name: &str, configured: &str, target: Option<&str>) -> Result<Vec<String>, ToolError> {
    let mut argv = shlex::split(configured)
        .filter(|argv| !argv.is_empty())
        .ok_or_else(|| ToolError::failed(tool_name, format!("Invalid configured command: {configured}")))?;
    argv.extend(target.map(str::to_string));
    Ok(argv)
}

/// How the check is shown in the command log.
fn display(argv: &[String]) -> String {
    shlex::try_join(argv.iter().map(String::as_str)).unwrap_or_else(|_| argv.join(" "))
}

async fn run_check(tool_name: &str, workspace: &Workspace, argv: Vec<String>) -> Result<ToolOutput, ToolError> {
    let command = display(&argv);
    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..])
        .current_dir(workspace.root())
        .env("PYTHONPATH", workspace.root());
    run_reported(tool_name, &command, cmd).await
}

pub struct RunLinterTool {
    workspace: Arc<Workspace>,
    linter: String,
}

impl RunLinterTool {
    pub fn new(workspace: Arc<Workspace>, linter: impl Into<String>) -> Self {
        Self {
            workspace,
            linter: linter.into(),
        }
    }

    fn argv_for(&self, arguments: &serde_json::Value) -> Result<Vec<String>, ToolError> {
        let target = optional_str(arguments, "filepath")
            .or_else(|| optional_str(arguments, "directory_path"))
            .unwrap_or(".");
        check_argv("run_linter", &self.linter, Some(target))
    }
}

#[async_trait]
impl Tool for RunLinterTool {
    fn name(&self) -> &str {
        "run_linter"
    }

    fn description(&self) -> &str {
        "Runs the project linter on a file or directory, or on the whole project if none is given."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filepath": {
                    "type": "string",
                    "description": "Optional file to lint."
                },
                "directory_path": {
                    "type": "string",
                    "description": "Optional directory to lint."
                }
            }
        })
    }

    fn command_line(&self, arguments: &serde_json::Value) -> Option<String> {
        self.argv_for(arguments).ok().map(|argv| display(&argv))
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let argv = self.argv_for(&arguments)?;
        run_check(self.name(), &self.workspace, argv).await
    }
}

pub struct RunTestsTool {
    workspace: Arc<Workspace>,
    runner: String,
}

impl RunTestsTool {
    pub fn new(workspace: Arc<Workspace>, runner: impl Into<String>) -> Self {
        Self {
            workspace,
            runner: runner.into(),
        }
    }

    fn argv_for(&self, arguments: &serde_json::Value) -> Result<Vec<String>, ToolError> {
        check_argv("run_tests", &self.runner, optional_str(arguments, "directory_path"))
    }
}

#[async_trait]
impl Tool for RunTestsTool {
    fn name(&self) -> &str {
        "run_tests"
    }

    fn description(&self) -> &str {
        "Runs the project test suite in a directory, or in the project root if none is given."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "directory_path": {
                    "type": "string",
                    "description": "Optional directory containing the tests."
                }
            }
        })
    }

    fn command_line(&self, arguments: &serde_json::Value) -> Option<String> {
        self.argv_for(arguments).ok().map(|argv| display(&argv))
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let argv = self.argv_for(&arguments)?;
        run_check(self.name(), &self.workspace, argv).await
    }
}
