//! Domain event system: decoupled observation of the control loop.
//!
//! Events are published when a tool runs, a task ends or memory syncs.
//! Subscribers (the CLI in verbose mode, tests) react without coupling to
//! the loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A tool call went through the dispatcher
    ToolExecuted {
        tool_name: String,
        status: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A user request reached a terminal state
    TaskCompleted {
        status: String,
        iterations: u32,
        timestamp: DateTime<Utc>,
    },

    /// Memory sync refreshed stale cache entries and pruned old records
    MemorySynced {
        refreshed_files: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::ToolExecuted {
            tool_name: "read_file".into(),
            status: "success".into(),
            duration_ms: 4,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::ToolExecuted { tool_name, status, .. } => {
                assert_eq!(tool_name, "read_file");
                assert_eq!(status, "success");
            }
            _ => panic!("Expected ToolExecuted event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(4);
        bus.publish(DomainEvent::MemorySynced {
            refreshed_files: 0,
            timestamp: Utc::now(),
        });
    }
}
