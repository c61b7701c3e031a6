//! codewright CLI: the main entry point.
//!
//! Commands:
//! - `chat`    Interactive session (default)
//! - `run`     Handle a single request and exit
//! - `status`  Show configuration and project memory status
//! - `memory`  Inspect or clean up project memory
//! - `onboard` Write a default config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod terminal;

#[derive(Parser)]
#[command(
    name = "codewright",
    about = "codewright: a local coding assistant with confirmed, undoable actions",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Project directory (defaults to the current directory)
    #[arg(short, long, global = true, env = "CODEWRIGHT_PROJECT")]
    project: Option<PathBuf>,

    /// Approve destructive actions without asking
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session
    Chat,

    /// Handle a single request and exit
    Run {
        /// The request to handle
        #[arg(short, long)]
        message: String,
    },

    /// Show configuration and memory status
    Status,

    /// Inspect project memory
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Write a default configuration file
    Onboard,
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Print the memory summary as JSON
    Summary,

    /// Search learned patterns
    Patterns {
        /// Restrict to one pattern type (`tool_effectiveness` shows tool stats)
        #[arg(short = 't', long)]
        pattern_type: Option<String>,

        /// Match patterns recorded with this query
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Remove records older than the given number of days
    Cleanup {
        #[arg(short, long)]
        days: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so the session output stays readable
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let project = cli.project;
    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => commands::chat::run(project, cli.yes, cli.verbose).await?,
        Commands::Run { message } => commands::run::run(project, &message, cli.yes).await?,
        Commands::Status => commands::status::run(project).await?,
        Commands::Memory { action } => match action {
            MemoryAction::Summary => commands::memory::summary(project).await?,
            MemoryAction::Patterns { pattern_type, query } => {
                commands::memory::patterns(project, pattern_type.as_deref(), query.as_deref()).await?
            }
            MemoryAction::Cleanup { days } => commands::memory::cleanup(project, days).await?,
        },
        Commands::Onboard => commands::onboard::run().await?,
    }

    Ok(())
}
