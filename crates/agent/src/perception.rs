//! Building the per-iteration [`Perception`].

use chrono::Utc;
use codewright_core::event::{DomainEvent, EventBus};
use codewright_core::reasoning::{EnvironmentInfo, Perception};
use codewright_core::tool::ToolResult;
use codewright_memory::SharedMemory;
use tracing::debug;

/// Sync memory (rate-limited) and snapshot what the reasoner should see.
pub async fn perceive(
    memory: &SharedMemory,
    environment: &EnvironmentInfo,
    events: Option<&EventBus>,
    user_input: Option<String>,
    tool_output: Option<ToolResult>,
) -> Perception {
    let memory_context = {
        let mut memory = memory.lock().await;
        if let Some(refreshed) = memory.sync(false) {
            debug!(refreshed, "Memory synced");
            if let Some(events) = events {
                events.publish(DomainEvent::MemorySynced {
                    refreshed_files: refreshed,
                    timestamp: Utc::now(),
                });
            }
        }
        memory.current_context()
    };

    Perception {
        user_input,
        tool_output,
        memory_context,
        environment: environment.clone(),
    }
}
