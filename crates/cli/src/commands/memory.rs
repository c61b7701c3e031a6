//! `codewright memory`: inspect and maintain project memory.

use codewright_core::tool::Tool;
use codewright_tools::memory_tools::{GetMemoryStatusTool, SearchMemoryPatternsTool};
use std::path::PathBuf;

use super::session;

pub async fn summary(project: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = session::load_config()?;
    let root = session::project_root(project)?;
    let memory = session::open_memory(&config, &root);

    let output = GetMemoryStatusTool::new(memory).execute(serde_json::json!({})).await?;
    println!("{}", output.content);
    Ok(())
}

pub async fn patterns(
    project: Option<PathBuf>,
    pattern_type: Option<&str>,
    query: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = session::load_config()?;
    let root = session::project_root(project)?;
    let memory = session::open_memory(&config, &root);

    let output = SearchMemoryPatternsTool::new(memory)
        .execute(serde_json::json!({ "pattern_type": pattern_type, "query": query }))
        .await?;
    println!("{}", output.content);
    Ok(())
}

pub async fn cleanup(project: Option<PathBuf>, days: Option<u32>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = session::load_config()?;
    if let Some(days) = days {
        config.memory.cleanup_days = days;
    }
    let root = session::project_root(project)?;
    let memory = session::open_memory(&config, &root);

    memory.lock().await.sync(true);
    println!(
        "Removed memory records older than {} days from {}",
        config.memory.cleanup_days,
        config.memory.store_path(&root).display()
    );
    Ok(())
}
