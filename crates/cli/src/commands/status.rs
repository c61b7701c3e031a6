//! `codewright status`: configuration and memory overview.

use codewright_config::AppConfig;
use std::path::PathBuf;

use super::session;

pub async fn run(project: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = session::load_config()?;
    let root = session::project_root(project)?;

    println!("codewright status");
    println!("=================");
    println!("  Config dir:     {}", AppConfig::config_dir().display());
    println!("  Project:        {}", root.display());
    println!("  Provider:       {}", config.default_provider);
    println!("  Model:          {}", config.default_model);
    println!("  API key:        {}", if config.has_api_key() { "set" } else { "missing" });
    println!("  Max iterations: {}", config.agent.max_iterations);
    println!("  Memory store:   {}", config.memory.store_path(&root).display());
    match config.tools.backup_path(&root) {
        Some(dir) => println!("  Backups:        {}", dir.display()),
        None => println!("  Backups:        disabled"),
    }

    let memory = session::open_memory(&config, &root);
    let summary = memory.lock().await.memory_summary().persistent;
    println!();
    println!("  Project patterns:  {}", summary.project_patterns.total);
    println!("  Success patterns:  {}", summary.success_patterns.total);
    println!("  Preferences:       {}", summary.user_preferences.total);
    println!("  Tools tracked:     {}", summary.tool_effectiveness.total);
    println!("  Files tracked:     {} ({} accesses)", summary.files_tracked, summary.total_file_accesses);
    println!("  Code snippets:     {}", summary.code_snippets);

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file; run `codewright onboard` first");
    }

    Ok(())
}
