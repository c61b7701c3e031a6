//! Two-tier memory for codewright.
//!
//! - [`working`]: session-scoped file cache, change history and command log
//! - [`persistent`]: per-project JSON store of access records, tool stats,
//!   patterns, preferences and snippets
//! - [`manager`]: the facade the control loop and tools talk to

pub mod manager;
pub mod persistent;
pub mod similarity;
pub mod working;

pub use manager::{MemoryManager, MemorySummary, SharedMemory, categorize_command};
pub use persistent::{PersistentMemory, PersistentSummary, RelevantPattern};
pub use working::{SessionSummary, WorkingMemory, fingerprint};
