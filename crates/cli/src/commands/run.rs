//! `codewright run -m <message>`: handle one request and exit.

use codewright_agent::TaskStatus;
use codewright_core::approval::{Approver, AutoApprove};
use codewright_core::event::EventBus;
use std::path::PathBuf;
use std::sync::Arc;

use super::session;
use crate::terminal::{self, TerminalApprover};

pub async fn run(project: Option<PathBuf>, message: &str, yes: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = session::load_config()?;
    let root = session::project_root(project)?;

    let approver: Arc<dyn Approver> = if yes {
        Arc::new(AutoApprove)
    } else {
        Arc::new(TerminalApprover::new(terminal::input_lines()))
    };
    let events = Arc::new(EventBus::default());
    let mut rx = events.subscribe();
    let mut agent = session::build_agent(&config, &root, approver, events)?;

    let outcome = agent.run(message).await?;

    while let Ok(event) = rx.try_recv() {
        terminal::print_event(&event);
    }
    terminal::print_outcome(&outcome);

    agent.dispatcher().memory().lock().await.sync(true);

    if outcome.status == TaskStatus::Error {
        return Err(outcome.message.into());
    }
    Ok(())
}
