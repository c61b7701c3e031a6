//! The codewright tool catalog.
//!
//! Tools let the assistant act on a project: read, write and search files,
//! apply code changes, run shell, git, lint and test commands, inspect its
//! own memory, and undo its last file modification. Every call goes through
//! the [`Dispatcher`], which gates destructive tools behind an approver and
//! records what undo needs.

pub mod action_log;
pub mod backup;
pub mod checks;
pub mod code_change;
pub mod dispatch;
pub mod file_read;
pub mod file_write;
pub mod list_dir;
pub mod memory_tools;
pub mod search;
pub mod shell;
pub mod undo;
pub mod workspace;

use codewright_config::ToolsConfig;
use codewright_core::tool::ToolRegistry;
use codewright_memory::SharedMemory;
use std::sync::Arc;

pub use action_log::{ActionLog, SharedActionLog};
pub use dispatch::{DESTRUCTIVE_TOOLS, Dispatcher, is_destructive};
pub use workspace::Workspace;

/// Create a registry holding the full tool catalog for one project.
pub fn default_registry(
    workspace: Arc<Workspace>,
    memory: SharedMemory,
    action_log: SharedActionLog,
    config: &ToolsConfig,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(file_read::ReadFileTool::new(workspace.clone())));
    registry.register(Box::new(file_write::WriteFileTool::new(workspace.clone())));
    registry.register(Box::new(file_write::DeleteFileTool::new(workspace.clone())));
    registry.register(Box::new(file_write::ClearFileContentTool::new(workspace.clone())));
    registry.register(Box::new(code_change::ApplyCodeChangeTool::new(workspace.clone())));
    registry.register(Box::new(shell::RunCommandTool::new(workspace.clone())));
    registry.register(Box::new(shell::RunGitCommandTool::new(workspace.clone())));
    registry.register(Box::new(list_dir::ListDirectoryTool::new(workspace.clone())));
    registry.register(Box::new(search::SearchFilesTool::new(workspace.clone())));
    registry.register(Box::new(checks::RunLinterTool::new(
        workspace.clone(),
        config.linter_command.clone(),
    )));
    registry.register(Box::new(checks::RunTestsTool::new(workspace, config.test_command.clone())));
    registry.register(Box::new(memory_tools::GetMemoryStatusTool::new(memory.clone())));
    registry.register(Box::new(memory_tools::SearchMemoryPatternsTool::new(memory.clone())));
    registry.register(Box::new(undo::UndoTool::new(action_log, memory)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use codewright_config::MemoryConfig;
    use codewright_memory::MemoryManager;

    #[test]
    fn catalog_is_complete() {
        let dir = tempfile::tempdir().unwrap();
        let memory = MemoryManager::new(dir.path(), &MemoryConfig::default()).shared();
        let registry = default_registry(
            Arc::new(Workspace::new(dir.path())),
            memory,
            ActionLog::shared(),
            &ToolsConfig::default(),
        );

        assert_eq!(
            registry.names(),
            vec![
                "apply_code_change",
                "clear_file_content",
                "delete_file",
                "get_memory_status",
                "list_directory_contents",
                "read_file",
                "run_command",
                "run_git_command",
                "run_linter",
                "run_tests",
                "search_files",
                "search_memory_patterns",
                "undo_last_action",
                "write_file",
            ]
        );
        for name in DESTRUCTIVE_TOOLS {
            if *name != "edit_notebook" {
                assert!(registry.get(name).is_some(), "{name} missing");
            }
        }
    }
}
