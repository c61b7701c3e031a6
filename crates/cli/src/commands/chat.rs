//! `codewright chat`: the interactive session.

use codewright_core::approval::{Approver, AutoApprove};
use codewright_core::event::EventBus;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use super::session;
use crate::terminal::{self, TerminalApprover};

pub async fn run(project: Option<PathBuf>, yes: bool, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = session::load_config()?;
    let root = session::project_root(project)?;
    let input = terminal::input_lines();

    let approver: Arc<dyn Approver> = if yes {
        Arc::new(AutoApprove)
    } else {
        Arc::new(TerminalApprover::new(input.clone()))
    };
    let events = Arc::new(EventBus::default());
    if verbose {
        let mut rx = events.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => terminal::print_event(&event),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }
    let mut agent = session::build_agent(&config, &root, approver, events)?;

    println!();
    println!("  codewright: interactive mode");
    println!();
    println!("  Project:   {}", root.display());
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Approval:  {}", if yes { "automatic" } else { "ask before destructive actions" });
    println!();
    println!("  Type 'help' for tools and commands, 'exit' to quit.");
    println!();

    while let Some(line) = terminal::read_line(&input, "  You > ").await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.to_ascii_lowercase().trim_start_matches("--") {
            "exit" | "quit" => break,
            "help" => terminal::print_help(&agent.dispatcher().definitions()),
            "status" => {
                let status = agent.status().await;
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
            "history" => terminal::print_history(agent.history()),
            "undo" => {
                let result = agent.dispatcher().undo().await;
                terminal::print_tool_result(&result);
            }
            _ => match agent.run(line).await {
                Ok(outcome) => terminal::print_outcome(&outcome),
                Err(e) => {
                    eprintln!("  [Error] {e}");
                    println!();
                }
            },
        }
    }

    {
        let mut memory = agent.dispatcher().memory().lock().await;
        memory.learn_from_session();
        memory.sync(true);
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}
