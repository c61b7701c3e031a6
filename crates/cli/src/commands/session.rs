//! Shared setup: configuration, project root and the assembled agent.

use codewright_agent::AgentLoop;
use codewright_config::AppConfig;
use codewright_core::approval::Approver;
use codewright_core::error::ReasoningError;
use codewright_core::event::EventBus;
use codewright_memory::{MemoryManager, SharedMemory};
use codewright_tools::{ActionLog, Dispatcher, Workspace, default_registry};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// The project directory every relative tool path resolves against.
pub fn project_root(project: Option<PathBuf>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let root = match project {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    if !root.is_dir() {
        return Err(format!("Project directory not found: {}", root.display()).into());
    }
    Ok(root.canonicalize()?)
}

pub fn open_memory(config: &AppConfig, root: &Path) -> SharedMemory {
    MemoryManager::new(root, &config.memory).shared()
}

/// Wire reasoner, tools, memory and approver into a ready control loop.
pub fn build_agent(
    config: &AppConfig,
    root: &Path,
    approver: Arc<dyn Approver>,
    events: Arc<EventBus>,
) -> Result<AgentLoop, Box<dyn std::error::Error>> {
    let reasoner = match codewright_providers::build_from_config(config) {
        Ok(reasoner) => reasoner,
        Err(e @ ReasoningError::NotConfigured(_)) => {
            print_key_help();
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    let memory = open_memory(config, root);
    let workspace = Arc::new(Workspace::from_config(root, &config.tools));
    let action_log = ActionLog::shared();
    let registry = default_registry(workspace.clone(), memory.clone(), action_log.clone(), &config.tools);
    let dispatcher =
        Dispatcher::new(registry, workspace, memory, action_log, approver).with_events(events.clone());

    Ok(AgentLoop::new(reasoner, dispatcher, root)
        .with_max_iterations(config.agent.max_iterations)
        .with_learn_every(config.agent.learn_every)
        .with_events(events))
}

fn print_key_help() {
    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    CODEWRIGHT_API_KEY   (generic)");
    eprintln!("    OPENROUTER_API_KEY   (recommended)");
    eprintln!("    OPENAI_API_KEY       (OpenAI direct)");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
    eprintln!("  Local providers (ollama, vllm, llamacpp) need no key.");
    eprintln!();
}
